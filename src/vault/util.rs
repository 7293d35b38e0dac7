use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Current time in the vault's configured local zone.
///
/// This is the single, canonical implementation — **do not** duplicate
/// this helper in other modules.
pub fn now_local(zone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&zone)
}

/// Read a whole-file JSON list. A missing file is an empty list; a present
/// but unreadable or unparsable file is an error the caller decides how to
/// degrade.
pub fn read_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: Vec<T> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(parsed)
}

/// Whole-file rewrite of a JSON list, pretty-printed UTF-8 with a trailing
/// newline. Creates parent directories as needed.
pub fn write_json_list<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(items)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Whole-file rewrite of a single JSON value, same conventions as
/// [`write_json_list`].
pub fn write_json_value<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_json_list, write_json_list};
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = tempdir().expect("tempdir");
        let got: Vec<String> = read_json_list(&tmp.path().join("nope.json")).expect("read");
        assert!(got.is_empty());
    }

    #[test]
    fn list_round_trips_with_trailing_newline() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("list.json");
        write_json_list(&path, &["a".to_string(), "b".to_string()]).expect("write");

        let raw = std::fs::read_to_string(&path).expect("raw");
        assert!(raw.ends_with('\n'));

        let got: Vec<String> = read_json_list(&path).expect("read");
        assert_eq!(got, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn corrupt_file_is_an_error_not_empty() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").expect("write");
        let got: anyhow::Result<Vec<String>> = read_json_list(&path);
        assert!(got.is_err());
    }
}
