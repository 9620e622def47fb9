//! # heal_llm
//!
//! Code generators for selfheal.
//!
//! - [`OpenAiGenerator`]: any OpenAI-compatible chat completions endpoint
//! - [`CannedGenerator`]: built-in programs for offline runs and demos
//!
//! Both implement [`heal_core::Generator`].

pub mod canned;
pub mod error;
pub mod extract;
pub mod openai;
pub mod prompt;

pub use canned::CannedGenerator;
pub use error::{LlmError, LlmResult};
pub use extract::extract_code;
pub use openai::{OpenAiConfig, OpenAiGenerator, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use prompt::build_prompt;
