use ledgerwise_domain::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Invalid `{table}` record: {message}")]
    InvalidRecord { table: String, message: String },
    #[error("Error inserting into {table}: {message}")]
    Persistence { table: String, message: String },
    #[error("Aggregate for user {user} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        user: UserId,
        expected: u64,
        found: u64,
    },
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("Backup `{0}` not found")]
    BackupNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
