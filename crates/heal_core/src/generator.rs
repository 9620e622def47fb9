//! Code generator interface.
//!
//! The orchestrator talks to a text-generation service only through the
//! [`Generator`] trait. Implementations live outside this crate; a scripted
//! implementation is provided here for tests and offline use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use heal_runner::Language;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input to one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user's natural-language request
    pub request: String,
    /// Target language
    pub language: Language,
    /// Failure context from earlier attempts, if any
    pub feedback: Option<String>,
    /// 1-based attempt this generation is for
    pub attempt: u32,
}

impl GenerationRequest {
    pub fn new(request: impl Into<String>, language: Language) -> Self {
        Self {
            request: request.into(),
            language,
            feedback: None,
            attempt: 1,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
}

/// Failure of a generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generator API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generator returned an empty response")]
    EmptyResponse,

    #[error("Generator cannot produce {language} code: {reason}")]
    Unsupported { language: String, reason: String },

    #[error("Generation failed: {0}")]
    Other(String),
}

/// A service that turns a request into source code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce source code for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Generator that replays a fixed script of responses.
///
/// Responses are returned in order; the last one repeats once the script
/// runs out. Every request is captured.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    responses: Arc<RwLock<Vec<Result<String, GenerationError>>>>,
    index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<GenerationRequest>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn respond(self, code: impl Into<String>) -> Self {
        self.responses.write().push(Ok(code.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: GenerationError) -> Self {
        self.responses.write().push(Err(error));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.captured.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.captured.write().push(request.clone());

        let responses = self.responses.read();
        let index = self.index.fetch_add(1, Ordering::SeqCst);
        match responses.get(index).or_else(|| responses.last()) {
            Some(response) => response.clone(),
            None => Err(GenerationError::Other("no scripted response".to_string())),
        }
    }
}
