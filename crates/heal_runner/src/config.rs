//! Sandbox configuration types.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cap on captured bytes per output stream.
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

/// Process sandbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Extra environment variables for every step
    pub env: HashMap<String, String>,
    /// Maximum bytes kept per stream (the tail is kept)
    pub output_limit: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

impl SandboxConfig {
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn output_limit(mut self, bytes: usize) -> Self {
        self.output_limit = bytes;
        self
    }
}

/// `<os temp dir>/selfheal`, the default parent of per-attempt directories.
pub fn default_work_root() -> PathBuf {
    std::env::temp_dir().join("selfheal")
}
