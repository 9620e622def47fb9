//! Mock sandbox for testing.
//!
//! Provides a scripted implementation of the [`Sandbox`] trait for use in
//! tests without spawning processes or touching the filesystem.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{RunnerError, RunnerResult};
use crate::profiles::{Language, LanguageProfile};
use crate::report::{ExecutionReport, StepKind, StepResult};
use crate::runner::Sandbox;

/// Scripted outcome of one step.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl MockStep {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
            duration_ms: 10,
        }
    }

    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
            duration_ms: 10,
        }
    }

    pub fn timeout() -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
            duration_ms: 10,
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    fn into_result(self, step: StepKind) -> StepResult {
        let started_at = Utc::now();
        StepResult {
            step,
            command: vec![format!("mock-{}", step)],
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
            timed_out: self.timed_out,
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(self.duration_ms as i64),
            duration_ms: self.duration_ms,
        }
    }
}

/// Predefined response for one `run` call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Steps to report; a build step is only reported when the profile has
    /// one, and a test step only when the profile would test the artifact.
    Steps {
        build: Option<MockStep>,
        run: Option<MockStep>,
        test: Option<MockStep>,
    },
    /// Fail with [`RunnerError::SandboxSetup`].
    SetupFailure(String),
}

impl MockOutcome {
    /// Build (if any) and run both succeed.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::Steps {
            build: Some(MockStep::ok("")),
            run: Some(MockStep::ok(stdout)),
            test: None,
        }
    }

    /// Build fails; run is skipped.
    pub fn compile_error(stderr: impl Into<String>) -> Self {
        Self::Steps {
            build: Some(MockStep::fail(1, stderr)),
            run: None,
            test: None,
        }
    }

    /// Build (if any) succeeds, run exits non-zero.
    pub fn runtime_error(stderr: impl Into<String>) -> Self {
        Self::Steps {
            build: Some(MockStep::ok("")),
            run: Some(MockStep::fail(1, stderr)),
            test: None,
        }
    }

    /// Build (if any) succeeds, run exceeds the timeout.
    pub fn timeout() -> Self {
        Self::Steps {
            build: Some(MockStep::ok("")),
            run: Some(MockStep::timeout()),
            test: None,
        }
    }

    /// Build and run succeed, the artifact's own tests fail.
    pub fn test_failure(output: impl Into<String>) -> Self {
        Self::Steps {
            build: Some(MockStep::ok("")),
            run: Some(MockStep::ok("")),
            test: Some(MockStep::fail(101, "").with_stdout(output)),
        }
    }

    pub fn setup_failure(message: impl Into<String>) -> Self {
        Self::SetupFailure(message.into())
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedRun {
    pub language: Language,
    pub artifact: String,
    pub work_root: PathBuf,
    pub timeout: Duration,
}

/// Mock sandbox for testing.
///
/// Returns scripted outcomes in order, cycling when the script runs out,
/// and captures every call.
#[derive(Clone)]
pub struct MockSandbox {
    /// Predefined outcomes for run calls.
    outcomes: Arc<RwLock<Vec<MockOutcome>>>,
    /// Index of next outcome to return.
    outcome_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured: Arc<RwLock<Vec<CapturedRun>>>,
}

impl Default for MockSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSandbox {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(Vec::new())),
            outcome_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add an outcome for the next run call.
    pub fn add_outcome(self, outcome: MockOutcome) -> Self {
        self.outcomes.write().push(outcome);
        self
    }

    /// Replace the outcome script.
    pub fn with_outcomes(self, outcomes: Vec<MockOutcome>) -> Self {
        *self.outcomes.write() = outcomes;
        self
    }

    /// Get all captured calls.
    pub fn calls(&self) -> Vec<CapturedRun> {
        self.captured.read().clone()
    }

    /// Get the number of run calls made.
    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    fn next_outcome(&self) -> MockOutcome {
        let outcomes = self.outcomes.read();
        if outcomes.is_empty() {
            return MockOutcome::success("");
        }
        let index = self.outcome_index.fetch_add(1, Ordering::SeqCst);
        outcomes[index % outcomes.len()].clone()
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    async fn run(
        &self,
        profile: &LanguageProfile,
        artifact: &str,
        work_root: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> RunnerResult<ExecutionReport> {
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        self.captured.write().push(CapturedRun {
            language: profile.language,
            artifact: artifact.to_string(),
            work_root: work_root.to_path_buf(),
            timeout,
        });

        let (build, run, test) = match self.next_outcome() {
            MockOutcome::SetupFailure(message) => return Err(RunnerError::SandboxSetup(message)),
            MockOutcome::Steps { build, run, test } => (build, run, test),
        };

        let mut report = ExecutionReport::new(work_root.join("mock-workdir"), timeout);

        if profile.has_build_step() {
            if let Some(step) = build {
                let result = step.into_result(StepKind::Build);
                let built = result.success();
                report.build = Some(result);
                if !built {
                    return Ok(report);
                }
            }
        } else if let Some(step) = build.filter(|s| !s.timed_out && s.exit_code != Some(0)) {
            // Interpreted languages surface compile failures from the run step.
            report.run = Some(step.into_result(StepKind::Run));
            return Ok(report);
        }

        report.run = run.map(|step| step.into_result(StepKind::Run));
        let ran = report.run.as_ref().is_some_and(|r| r.success());
        if ran && profile.test_command(artifact).is_some() {
            report.test = test.map(|step| step.into_result(StepKind::Test));
        }
        Ok(report)
    }
}
