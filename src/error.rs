use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultErrorCode {
    E001Locked,
    E002ConfigInvalid,
    E003EntriesInvalid,
}

impl VaultErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001Locked => "E001_LOCKED",
            Self::E002ConfigInvalid => "E002_CONFIG_INVALID",
            Self::E003EntriesInvalid => "E003_ENTRIES_INVALID",
        }
    }
}

#[derive(Debug, Error)]
pub enum NewsVaultError {
    #[error("{}: config file invalid or unreadable: {0}", VaultErrorCode::E002ConfigInvalid.as_str())]
    InvalidConfig(String),
    #[error("{}: entries input invalid or unreadable: {0}", VaultErrorCode::E003EntriesInvalid.as_str())]
    InvalidEntries(String),
    #[error("{}: another ingest cycle holds the vault lock: {0}", VaultErrorCode::E001Locked.as_str())]
    CycleLocked(String),
}
