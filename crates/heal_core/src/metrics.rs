//! Metrics sink.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::attempt::{Attempt, HealingResult, Verdict};
use crate::task::Task;

/// Receiver of attempt and task outcomes.
pub trait MetricsSink: Send + Sync {
    fn record_attempt(&self, task: &Task, attempt: &Attempt);
    fn record_result(&self, task: &Task, result: &HealingResult);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_attempt(&self, _task: &Task, _attempt: &Attempt) {}
    fn record_result(&self, _task: &Task, _result: &HealingResult) {}
}

/// Aggregated counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub tasks: u64,
    pub successes: u64,
    pub failures: u64,
    pub attempts: u64,
    pub verdicts: HashMap<Verdict, u64>,
    pub total_elapsed_ms: u64,
}

impl MetricsSnapshot {
    /// Fraction of finished tasks that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.tasks == 0 {
            0.0
        } else {
            self.successes as f64 / self.tasks as f64
        }
    }

    /// Mean attempts per finished task.
    pub fn mean_attempts(&self) -> f64 {
        if self.tasks == 0 {
            0.0
        } else {
            self.attempts as f64 / self.tasks as f64
        }
    }

    pub fn verdict_count(&self, verdict: Verdict) -> u64 {
        self.verdicts.get(&verdict).copied().unwrap_or(0)
    }
}

/// In-process counters, safe to share between concurrent tasks.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().clone()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_attempt(&self, _task: &Task, attempt: &Attempt) {
        let mut inner = self.inner.lock();
        inner.attempts += 1;
        *inner.verdicts.entry(attempt.verdict).or_insert(0) += 1;
    }

    fn record_result(&self, _task: &Task, result: &HealingResult) {
        let mut inner = self.inner.lock();
        inner.tasks += 1;
        if result.is_success() {
            inner.successes += 1;
        } else {
            inner.failures += 1;
        }
        inner.total_elapsed_ms += result.elapsed_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::TaskStatus;
    use chrono::Utc;

    fn attempt(sequence: u32, verdict: Verdict) -> Attempt {
        Attempt {
            sequence,
            artifact: None,
            build: None,
            run: None,
            test: None,
            verdict,
            error_summary: String::new(),
            started_at: Utc::now(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_in_memory_metrics() {
        let metrics = InMemoryMetrics::new();
        let task = Task::new("x", "python");

        let attempts = vec![attempt(1, Verdict::CompileError), attempt(2, Verdict::Success)];
        for a in &attempts {
            metrics.record_attempt(&task, a);
        }
        metrics.record_result(
            &task,
            &HealingResult {
                task_id: task.id,
                language: "python".to_string(),
                status: TaskStatus::Success,
                attempts,
                elapsed_ms: 40,
            },
        );
        metrics.record_result(
            &task,
            &HealingResult {
                task_id: task.id,
                language: "python".to_string(),
                status: TaskStatus::Failed,
                attempts: Vec::new(),
                elapsed_ms: 10,
            },
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks, 2);
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.verdict_count(Verdict::CompileError), 1);
        assert_eq!(snapshot.verdict_count(Verdict::Timeout), 0);
        assert!((snapshot.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!((snapshot.mean_attempts() - 1.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.total_elapsed_ms, 50);
    }

    #[test]
    fn test_empty_snapshot_rates() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.success_rate(), 0.0);
        assert_eq!(snapshot.mean_attempts(), 0.0);
    }
}
