//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that abort a healing run.
///
/// Per-attempt failures never show up here; they are recorded as attempt
/// verdicts instead.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Healing cancelled")]
    Cancelled,

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<heal_runner::RunnerError> for CoreError {
    fn from(err: heal_runner::RunnerError) -> Self {
        match err {
            heal_runner::RunnerError::UnsupportedLanguage(name) => Self::UnsupportedLanguage(name),
            heal_runner::RunnerError::Cancelled => Self::Cancelled,
            heal_runner::RunnerError::Io(e) => Self::Io(e),
            other => Self::Sandbox(other.to_string()),
        }
    }
}
