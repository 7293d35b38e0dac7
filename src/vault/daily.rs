//! Daily archive store: one append-only JSON partition per calendar day,
//! rewritten whole on every append.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

use crate::vault::record::{DayKey, ItemRecord};
use crate::vault::util::{read_json_list, write_json_list};
use crate::vault::warn::{self, WarnEvent};

/// Load a day partition, degrading a read failure to "partition empty". That
/// risks a duplicate append and is warned as such; the alternative (aborting
/// the cycle) would stop delivery entirely.
pub fn load_partition(data_dir: &Path, key: DayKey, source: &str) -> Vec<ItemRecord> {
    let path = key.partition_path(data_dir);
    match read_json_list(&path) {
        Ok(records) => records,
        Err(err) => {
            warn::emit(WarnEvent {
                code: "PARTITION_READ_FAILED",
                stage: "daily",
                path: &path.display().to_string(),
                source,
                reason: "treating-partition-as-empty-duplicate-append-risk",
                err: &format!("{err:#}"),
            });
            Vec::new()
        }
    }
}

/// Strict partition read for verification paths.
pub fn read_partition(data_dir: &Path, key: DayKey) -> Result<Vec<ItemRecord>> {
    read_json_list(&key.partition_path(data_dir))
}

fn known_keys(existing: &[ItemRecord]) -> (BTreeSet<String>, BTreeSet<String>, BTreeSet<String>) {
    let mut ids = BTreeSet::new();
    let mut urls = BTreeSet::new();
    let mut titles = BTreeSet::new();
    for record in existing {
        if let Some(id) = record.id.as_deref().filter(|v| !v.is_empty()) {
            ids.insert(id.to_string());
        }
        if !record.url.is_empty() {
            urls.insert(record.url.clone());
        }
        if !record.title.is_empty() {
            titles.insert(record.title.clone());
        }
    }
    (ids, urls, titles)
}

/// Append `records` to the partition for `key`, returning exactly the subset
/// that was newly appended. Dedup is by id, then url; `title_fallback`
/// additionally suppresses repeated titles (deprecated, off by default).
/// Records with no id and no url are always treated as new and warned.
///
/// A write failure returns an empty added-list so no caller claims delivery
/// for records that were never durably archived; the next cycle retries.
pub fn append(
    data_dir: &Path,
    key: DayKey,
    records: &[ItemRecord],
    title_fallback: bool,
    source: &str,
) -> Vec<ItemRecord> {
    if records.is_empty() {
        return Vec::new();
    }

    let path = key.partition_path(data_dir);
    let mut existing = load_partition(data_dir, key, source);
    let (mut seen_ids, mut seen_urls, mut seen_titles) = known_keys(&existing);

    let mut added = Vec::new();
    for record in records {
        let id = record.id.as_deref().filter(|v| !v.is_empty());
        let url = match record.url.as_str() {
            "" => None,
            v => Some(v),
        };

        if id.is_none() && url.is_none() {
            warn::emit(WarnEvent {
                code: "IDENTITY_AMBIGUOUS",
                stage: "daily",
                path: &path.display().to_string(),
                source,
                reason: "entry-has-no-id-or-url-treated-as-new",
                err: "na",
            });
        }

        let duplicate = id.is_some_and(|v| seen_ids.contains(v))
            || url.is_some_and(|v| seen_urls.contains(v))
            || (title_fallback && !record.title.is_empty() && seen_titles.contains(&record.title));
        if duplicate {
            continue;
        }

        if let Some(v) = id {
            seen_ids.insert(v.to_string());
        }
        if let Some(v) = url {
            seen_urls.insert(v.to_string());
        }
        if !record.title.is_empty() {
            seen_titles.insert(record.title.clone());
        }

        existing.push(record.clone());
        added.push(record.clone());
    }

    if added.is_empty() {
        return Vec::new();
    }

    if let Err(err) = write_json_list(&path, &existing) {
        warn::emit(WarnEvent {
            code: "PARTITION_WRITE_FAILED",
            stage: "daily",
            path: &path.display().to_string(),
            source,
            reason: "retry-next-cycle",
            err: &format!("{err:#}"),
        });
        return Vec::new();
    }

    added
}

#[cfg(test)]
mod tests {
    use super::{append, read_partition};
    use crate::vault::record::{DayKey, ItemRecord};
    use tempfile::tempdir;

    fn key() -> DayKey {
        DayKey { year: 2025, month: 11, day: 9 }
    }

    fn record(id: Option<&str>, url: &str, title: &str) -> ItemRecord {
        ItemRecord {
            id: id.map(str::to_string),
            title: title.to_string(),
            description_full: String::new(),
            image: None,
            categories: Vec::new(),
            author: None,
            published: None,
            language: "ar-SA".to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn first_append_returns_all_and_resubmission_returns_none() {
        let tmp = tempdir().expect("tempdir");
        let records = vec![
            record(Some("a"), "https://x/a", "A"),
            record(Some("b"), "https://x/b", "B"),
            record(Some("c"), "https://x/c", "C"),
        ];

        let added = append(tmp.path(), key(), &records, false, "news");
        assert_eq!(added.len(), 3);

        let again = append(tmp.path(), key(), &records, false, "news");
        assert!(again.is_empty());

        let stored = read_partition(tmp.path(), key()).expect("read");
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn url_match_suppresses_when_id_differs() {
        let tmp = tempdir().expect("tempdir");
        append(tmp.path(), key(), &[record(Some("a"), "https://x/a", "A")], false, "news");

        let added = append(
            tmp.path(),
            key(),
            &[record(Some("a2"), "https://x/a", "A again")],
            false,
            "news",
        );
        assert!(added.is_empty());
    }

    #[test]
    fn duplicates_within_one_batch_are_collapsed() {
        let tmp = tempdir().expect("tempdir");
        let records = vec![
            record(Some("a"), "https://x/a", "A"),
            record(Some("a"), "https://x/a", "A"),
        ];
        let added = append(tmp.path(), key(), &records, false, "news");
        assert_eq!(added.len(), 1);

        let stored = read_partition(tmp.path(), key()).expect("read");
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn identityless_records_always_append() {
        let tmp = tempdir().expect("tempdir");
        let ghost = record(None, "", "");
        append(tmp.path(), key(), &[ghost.clone()], false, "news");
        let added = append(tmp.path(), key(), &[ghost], false, "news");
        assert_eq!(added.len(), 1, "no id and no url disqualifies dedup");
    }

    #[test]
    fn title_fallback_only_applies_when_enabled() {
        let tmp = tempdir().expect("tempdir");
        append(tmp.path(), key(), &[record(Some("a"), "https://x/a", "Same Title")], false, "news");

        let other = record(Some("b"), "https://x/b", "Same Title");
        let added = append(tmp.path(), key(), &[other.clone()], false, "news");
        assert_eq!(added.len(), 1);

        let added = append(tmp.path(), key(), &[record(Some("c"), "https://x/c", "Same Title")], true, "news");
        assert!(added.is_empty());
    }

    #[test]
    fn corrupt_partition_reads_as_empty_and_append_still_lands() {
        let tmp = tempdir().expect("tempdir");
        let path = key().partition_path(tmp.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "{not json").expect("corrupt");

        // The unreadable partition degrades to empty: the batch is accepted
        // (duplicate-append risk) rather than the cycle aborting.
        let added = append(tmp.path(), key(), &[record(Some("a"), "https://x/a", "A")], false, "news");
        assert_eq!(added.len(), 1);

        let stored = read_partition(tmp.path(), key()).expect("read");
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn append_preserves_input_order() {
        let tmp = tempdir().expect("tempdir");
        append(tmp.path(), key(), &[record(Some("a"), "https://x/a", "A")], false, "news");
        append(
            tmp.path(),
            key(),
            &[
                record(Some("b"), "https://x/b", "B"),
                record(Some("c"), "https://x/c", "C"),
            ],
            false,
            "news",
        );

        let stored = read_partition(tmp.path(), key()).expect("read");
        let ids: Vec<Option<String>> = stored.into_iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                Some("a".to_string()),
                Some("b".to_string()),
                Some("c".to_string())
            ]
        );
    }
}
