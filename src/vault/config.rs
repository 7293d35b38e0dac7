use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::NewsVaultError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub timezone: String,
    pub source: String,
    pub default_language: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            timezone: "Africa/Casablanca".to_string(),
            source: "news".to_string(),
            default_language: "ar-SA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { page_size: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DedupConfig {
    /// Deprecated fallback: also match on title text. Risks false-positive
    /// suppression when titles repeat; id/url stays authoritative either way.
    pub title_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    pub archive: ArchiveConfig,
    pub index: IndexConfig,
    pub dedup: DedupConfig,
}

impl VaultConfig {
    pub fn zone(&self) -> Result<Tz> {
        self.archive
            .timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("invalid timezone: {}", self.archive.timezone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialVaultConfig {
    archive: Option<ArchiveConfig>,
    index: Option<IndexConfig>,
    dedup: Option<DedupConfig>,
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => {
            let trimmed = v.trim();
            match trimmed {
                "1" | "true" | "TRUE" | "yes" | "on" => true,
                "0" | "false" | "FALSE" | "no" | "off" => false,
                _ => fallback,
            }
        }
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &VaultConfig) -> Result<()> {
    cfg.zone()?;
    if cfg.archive.source.trim().is_empty() {
        return Err(anyhow!("invalid source name: cannot be empty"));
    }
    if cfg.archive.default_language.trim().is_empty() {
        return Err(anyhow!("invalid default language: cannot be empty"));
    }
    if cfg.index.page_size == 0 {
        return Err(anyhow!("invalid index page size: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("NEWSVAULT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    match env::var("NEWSVAULT_HOME") {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim()).join("newsvault.toml")),
        _ => {
            let home = dirs::home_dir()?;
            Some(home.join("newsvault").join("newsvault.toml"))
        }
    }
}

fn merge_file_config(base: &mut VaultConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialVaultConfig = toml::from_str(&raw).map_err(|err| {
        NewsVaultError::InvalidConfig(format!("{}: {err}", path.display()))
    })?;
    if let Some(archive) = parsed.archive {
        base.archive = archive;
    }
    if let Some(index) = parsed.index {
        base.index = index;
    }
    if let Some(dedup) = parsed.dedup {
        base.dedup = dedup;
    }
    Ok(())
}

pub fn load_config() -> Result<VaultConfig> {
    let mut cfg = VaultConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.archive.timezone = env_or_string("NEWSVAULT_TIMEZONE", &cfg.archive.timezone);
    cfg.archive.source = env_or_string("NEWSVAULT_SOURCE", &cfg.archive.source);
    cfg.archive.default_language =
        env_or_string("NEWSVAULT_DEFAULT_LANGUAGE", &cfg.archive.default_language);
    cfg.index.page_size = env_or_usize("NEWSVAULT_PAGE_SIZE", cfg.index.page_size);
    cfg.dedup.title_fallback =
        env_or_bool("NEWSVAULT_DEDUP_TITLE_FALLBACK", cfg.dedup.title_fallback);

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::{PartialVaultConfig, VaultConfig, validate};

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&VaultConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut cfg = VaultConfig::default();
        cfg.archive.timezone = "Mars/Olympus_Mons".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn rejects_zero_page_size() {
        let mut cfg = VaultConfig::default();
        cfg.index.page_size = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn section_with_missing_keys_falls_back_to_defaults() {
        let parsed: PartialVaultConfig = toml::from_str("[index]\n").expect("parse");
        assert_eq!(parsed.index.expect("index").page_size, 500);

        let parsed: PartialVaultConfig =
            toml::from_str("[archive]\ntimezone = \"UTC\"\n").expect("parse");
        let archive = parsed.archive.expect("archive");
        assert_eq!(archive.timezone, "UTC");
        assert_eq!(archive.source, "news");
        assert_eq!(archive.default_language, "ar-SA");

        let parsed: PartialVaultConfig = toml::from_str("[dedup]\n").expect("parse");
        assert!(!parsed.dedup.expect("dedup").title_fallback);
    }
}
