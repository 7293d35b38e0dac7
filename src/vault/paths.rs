use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub vault_home: PathBuf,
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub lock_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<VaultPaths> {
    let home = required_home_dir()?;
    let vault_home = env_or_default_path("NEWSVAULT_HOME", home.join("newsvault"));

    let data_dir = env_or_default_path("NEWSVAULT_DATA_DIR", vault_home.join("data"));
    let index_dir = env_or_default_path("NEWSVAULT_INDEX_DIR", vault_home.join("global_index"));
    let ledger_dir = env_or_default_path("NEWSVAULT_LEDGER_DIR", vault_home.join("ledgers"));
    let lock_file = vault_home.join(".cycle.lock");

    Ok(VaultPaths {
        vault_home,
        data_dir,
        index_dir,
        ledger_dir,
        lock_file,
    })
}
