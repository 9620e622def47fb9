//! Healing orchestrator.
//!
//! Drives one task through generate, execute and classify until an attempt
//! succeeds or the attempt budget is spent. Whether to stop or retry after an
//! attempt is decided solely by [`decide`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use heal_runner::{LanguageProfile, RunnerError, Sandbox};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::attempt::{Attempt, HealingResult, TaskStatus, Verdict};
use crate::classifier::{classify, summarize, Classification};
use crate::config::HealingConfig;
use crate::error::{CoreError, CoreResult};
use crate::generator::{GenerationError, GenerationRequest, Generator};
use crate::ledger::{AttemptLedger, LedgerStore};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::observer::{notify, HealingState, NullObserver, ProgressEvent, ProgressObserver};
use crate::task::Task;

/// What happens after an attempt has been classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Succeed,
    Retry,
    Fail,
}

impl Transition {
    /// State entered by taking this transition.
    pub fn state(&self) -> HealingState {
        match self {
            Self::Succeed => HealingState::Succeeded,
            Self::Retry => HealingState::Retrying,
            Self::Fail => HealingState::Failed,
        }
    }
}

/// Transition table.
///
/// A success always ends the task; any other verdict retries while the
/// budget allows.
pub fn decide(verdict: Verdict, attempt: u32, max_attempts: u32) -> Transition {
    if verdict.is_success() {
        Transition::Succeed
    } else if attempt < max_attempts {
        Transition::Retry
    } else {
        Transition::Fail
    }
}

/// Runs the generate-build-run-classify loop for tasks.
///
/// An orchestrator holds no per-task state and can heal several tasks
/// concurrently.
pub struct HealingOrchestrator {
    generator: Arc<dyn Generator>,
    sandbox: Arc<dyn Sandbox>,
    observer: Arc<dyn ProgressObserver>,
    metrics: Arc<dyn MetricsSink>,
    config: HealingConfig,
}

impl HealingOrchestrator {
    pub fn new(generator: Arc<dyn Generator>, sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            generator,
            sandbox,
            observer: Arc::new(NullObserver),
            metrics: Arc::new(NoopMetrics),
            config: HealingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HealingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &HealingConfig {
        &self.config
    }

    /// Heal a task without external cancellation.
    pub async fn heal(&self, task: &Task) -> CoreResult<HealingResult> {
        self.heal_with_cancel(task, &CancellationToken::new()).await
    }

    /// Heal a task.
    ///
    /// Fails only for an invalid configuration, an unsupported language
    /// (before any attempt is made) or cancellation. Every other failure is
    /// recorded as an attempt verdict, and running out of attempts yields a
    /// [`TaskStatus::Failed`] result.
    pub async fn heal_with_cancel(
        &self,
        task: &Task,
        cancel: &CancellationToken,
    ) -> CoreResult<HealingResult> {
        self.config.validate()?;
        let profile = heal_runner::resolve(&task.language)?;
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let max_attempts = self.config.max_attempts;
        let timeout = self.config.step_timeout().unwrap_or(profile.timeout);
        let start = Instant::now();

        info!(
            "Healing task {} in {} (up to {} attempts, {:?} per step): {}",
            task.id, profile.display_name, max_attempts, timeout, task.request
        );

        let mut ledger = AttemptLedger::new(task.clone());
        let mut status = TaskStatus::Failed;

        for sequence in 1..=max_attempts {
            let attempt = self
                .run_attempt(task, profile, &ledger, sequence, timeout, cancel)
                .await?;
            let verdict = attempt.verdict;
            let summary = attempt.error_summary.clone();

            info!(
                "Attempt {}/{} finished in {}ms: {}",
                sequence, max_attempts, attempt.duration_ms, verdict
            );
            self.metrics.record_attempt(task, &attempt);
            ledger.record(attempt)?;

            let transition = decide(verdict, sequence, max_attempts);
            self.emit(
                task,
                sequence,
                transition.state(),
                Some(verdict),
                (!summary.is_empty()).then_some(summary),
            );

            match transition {
                Transition::Succeed => {
                    status = TaskStatus::Success;
                    break;
                }
                Transition::Retry => continue,
                Transition::Fail => break,
            }
        }

        let result = HealingResult {
            task_id: task.id,
            language: profile.language.to_string(),
            status,
            attempts: ledger.all().to_vec(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        match status {
            TaskStatus::Success => info!(
                "Task {} healed after {} attempt(s) in {}ms",
                task.id,
                result.attempts.len(),
                result.elapsed_ms
            ),
            TaskStatus::Failed => error!(
                "Task {} failed after {} attempt(s)",
                task.id,
                result.attempts.len()
            ),
        }

        self.persist(&ledger);
        self.metrics.record_result(task, &result);
        Ok(result)
    }

    async fn run_attempt(
        &self,
        task: &Task,
        profile: &LanguageProfile,
        ledger: &AttemptLedger,
        sequence: u32,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<Attempt> {
        let limit = self.config.summary_limit;
        let started_at = Utc::now();
        let start = Instant::now();

        self.emit(task, sequence, HealingState::Generating, None, None);

        let request = GenerationRequest {
            request: task.request.clone(),
            language: profile.language,
            feedback: ledger.feedback(self.config.feedback),
            attempt: sequence,
        };

        let generated = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            result = self.generator.generate(&request) => result,
        };

        let generated = generated.and_then(|code| {
            if code.trim().is_empty() {
                Err(GenerationError::EmptyResponse)
            } else {
                Ok(code)
            }
        });

        let artifact = match generated {
            Ok(code) => code,
            Err(e) => {
                warn!("Generation failed on attempt {}: {}", sequence, e);
                self.emit(task, sequence, HealingState::Classifying, None, None);
                return Ok(Attempt {
                    sequence,
                    artifact: None,
                    build: None,
                    run: None,
                    test: None,
                    verdict: Verdict::GeneratorError,
                    error_summary: summarize(&e.to_string(), limit),
                    started_at,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        self.emit(task, sequence, HealingState::Executing, None, None);

        let (build, run, test, classification) =
            match self
                .sandbox
                .run(profile, &artifact, &self.config.work_root, timeout, cancel)
                .await
            {
                Ok(report) => {
                    debug!(
                        "Attempt {} spent {}ms in {} sandbox step(s)",
                        sequence,
                        report.total_duration_ms(),
                        report.steps().count()
                    );
                    self.emit(task, sequence, HealingState::Classifying, None, None);
                    let classification = classify(profile, &report, limit);
                    (report.build, report.run, report.test, classification)
                }
                Err(RunnerError::Cancelled) => return Err(CoreError::Cancelled),
                Err(e) => {
                    error!("Sandbox error on attempt {}: {}", sequence, e);
                    self.emit(task, sequence, HealingState::Classifying, None, None);
                    let classification = Classification {
                        verdict: Verdict::RuntimeError,
                        summary: summarize(&format!("sandbox error: {}", e), limit),
                    };
                    (None, None, None, classification)
                }
            };

        Ok(Attempt {
            sequence,
            artifact: Some(artifact),
            build,
            run,
            test,
            verdict: classification.verdict,
            error_summary: classification.summary,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn emit(
        &self,
        task: &Task,
        attempt: u32,
        state: HealingState,
        verdict: Option<Verdict>,
        summary: Option<String>,
    ) {
        let event = ProgressEvent {
            task_id: task.id,
            attempt,
            max_attempts: self.config.max_attempts,
            state,
            verdict,
            summary,
        };
        notify(self.observer.as_ref(), &event);
    }

    fn persist(&self, ledger: &AttemptLedger) {
        let Some(dir) = &self.config.ledger_dir else {
            return;
        };
        if let Err(e) = LedgerStore::new(dir).save(ledger) {
            warn!("Failed to persist attempt ledger to {:?}: {}", dir, e);
        }
    }
}
