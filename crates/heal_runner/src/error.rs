//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur during runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Sandbox setup failed: {0}")]
    SandboxSetup(String),

    #[error("Failed to spawn {step} step `{command}`: {message}")]
    Spawn {
        step: String,
        command: String,
        message: String,
    },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
