//! Attempt and result model.

use chrono::{DateTime, Utc};
use heal_runner::StepResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    GeneratorError,
}

impl Verdict {
    /// Get all verdict variants.
    pub fn all() -> &'static [Verdict] {
        &[
            Verdict::Success,
            Verdict::CompileError,
            Verdict::RuntimeError,
            Verdict::Timeout,
            Verdict::GeneratorError,
        ]
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::CompileError => "compile error",
            Self::RuntimeError => "runtime error",
            Self::Timeout => "timeout",
            Self::GeneratorError => "generator error",
        };
        write!(f, "{}", label)
    }
}

/// One generate-build-run cycle.
///
/// Attempts are finalized once and never mutated after they are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based position within the task
    pub sequence: u32,
    /// Generated source, absent when generation failed
    pub artifact: Option<String>,
    /// Build step, if one ran
    pub build: Option<StepResult>,
    /// Run step, if one ran
    pub run: Option<StepResult>,
    /// The artifact's own tests, if they ran
    #[serde(default)]
    pub test: Option<StepResult>,
    /// Classification
    pub verdict: Verdict,
    /// Truncated failure summary, empty on success
    pub error_summary: String,
    /// When the attempt started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl Attempt {
    pub fn is_success(&self) -> bool {
        self.verdict.is_success()
    }

    /// Stdout of the run step, if it ran.
    pub fn output(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.stdout.as_str())
    }
}

/// Terminal status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a healing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingResult {
    pub task_id: Uuid,
    /// Canonical language name
    pub language: String,
    pub status: TaskStatus,
    /// Every attempt in order
    pub attempts: Vec<Attempt>,
    /// Total elapsed time in milliseconds
    pub elapsed_ms: u64,
}

impl HealingResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// The successful attempt; always the last one when present.
    pub fn winner(&self) -> Option<&Attempt> {
        if self.is_success() {
            self.attempts.last()
        } else {
            None
        }
    }

    /// Summary of the last failed attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.attempts
            .iter()
            .rev()
            .find(|a| !a.is_success())
            .map(|a| a.error_summary.as_str())
    }
}
