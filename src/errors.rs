use ledgerwise_config::ConfigError;
use ledgerwise_core::CoreError;
use thiserror::Error;

/// Top-level failure surfaced by [`crate::LedgerApp`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Extractor setup failed: {0}")]
    Extractor(String),
    #[error("{0}")]
    Invalid(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Message shown to the person at the keyboard. Save and network failures
    /// collapse into one retry prompt; input problems keep their detail.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Core(CoreError::Persistence { .. })
            | AppError::Core(CoreError::VersionConflict { .. })
            | AppError::Core(CoreError::Storage(_))
            | AppError::Core(CoreError::Io(_))
            | AppError::Core(CoreError::Extraction(_))
            | AppError::Io(_) => "Failed to process transaction. Please try again.".to_string(),
            AppError::Extractor(_) => {
                "The transaction extractor is not configured. Check the extractor settings."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}
