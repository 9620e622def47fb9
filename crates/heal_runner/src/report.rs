//! Execution report types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which sandbox step produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Build,
    Run,
    Test,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Run => write!(f, "run"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Result of one build, run or test step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step kind
    pub step: StepKind,
    /// Rendered command line
    pub command: Vec<String>,
    /// Exit code (absent when killed or timed out)
    pub exit_code: Option<i32>,
    /// Captured stdout (tail)
    pub stdout: String,
    /// Captured stderr (tail)
    pub stderr: String,
    /// Whether the step was killed for exceeding its timeout
    pub timed_out: bool,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl StepResult {
    /// Check if the step exited with code 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Everything the sandbox observed for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Working directory used (already removed when the report is returned)
    pub workdir: PathBuf,
    /// Build step, if the language has one
    pub build: Option<StepResult>,
    /// Run step, skipped when the build failed
    pub run: Option<StepResult>,
    /// Test step, present only when the artifact carries tests and the run succeeded
    #[serde(default)]
    pub test: Option<StepResult>,
    /// Per-step timeout that was applied
    pub timeout: Duration,
}

impl ExecutionReport {
    pub fn new(workdir: PathBuf, timeout: Duration) -> Self {
        Self {
            workdir,
            build: None,
            run: None,
            test: None,
            timeout,
        }
    }

    /// Whether any step was killed for exceeding the timeout.
    pub fn timed_out(&self) -> bool {
        self.steps().any(|s| s.timed_out)
    }

    /// Whether the build step ran and failed.
    pub fn build_failed(&self) -> bool {
        self.build.as_ref().is_some_and(|b| !b.success())
    }

    /// Steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &StepResult> {
        self.build.iter().chain(self.run.iter()).chain(self.test.iter())
    }

    /// Total time spent in steps.
    pub fn total_duration_ms(&self) -> u64 {
        self.steps().map(|s| s.duration_ms).sum()
    }
}
