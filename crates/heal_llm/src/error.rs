//! Error types for the LLM adapters.

use heal_core::GenerationError;
use thiserror::Error;

/// Result type alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM adapter errors.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM not configured: set {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured(_) | LlmError::Http(_) => Self::Unavailable(err.to_string()),
            LlmError::Api { status, body } => Self::Api {
                status,
                message: body,
            },
            LlmError::InvalidResponse(msg) => Self::Other(msg),
            LlmError::EmptyResponse(_) => Self::EmptyResponse,
        }
    }
}
