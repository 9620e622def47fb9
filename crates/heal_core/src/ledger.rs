//! Attempt ledger and its on-disk store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::attempt::Attempt;
use crate::config::FeedbackPolicy;
use crate::error::{CoreError, CoreResult};
use crate::task::Task;

/// Append-only record of a task's attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptLedger {
    task: Task,
    attempts: Vec<Attempt>,
}

impl AttemptLedger {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            attempts: Vec::new(),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Append a finalized attempt.
    ///
    /// Sequence numbers must continue the ledger exactly (`len + 1`).
    pub fn record(&mut self, attempt: Attempt) -> CoreResult<()> {
        let expected = self.attempts.len() as u32 + 1;
        if attempt.sequence != expected {
            return Err(CoreError::Ledger(format!(
                "out-of-order attempt {} for task {} (expected {})",
                attempt.sequence, self.task.id, expected
            )));
        }
        self.attempts.push(attempt);
        Ok(())
    }

    /// All attempts in order.
    pub fn all(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn latest(&self) -> Option<&Attempt> {
        self.attempts.last()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Failure context for the next generation.
    pub fn feedback(&self, policy: FeedbackPolicy) -> Option<String> {
        match policy {
            FeedbackPolicy::Latest => self
                .latest()
                .filter(|a| !a.error_summary.is_empty())
                .map(|a| a.error_summary.clone()),
            FeedbackPolicy::Cumulative => {
                let sections: Vec<String> = self
                    .attempts
                    .iter()
                    .filter(|a| !a.error_summary.is_empty())
                    .map(|a| format!("Attempt {} ({}):\n{}", a.sequence, a.verdict, a.error_summary))
                    .collect();
                if sections.is_empty() {
                    None
                } else {
                    Some(sections.join("\n\n"))
                }
            }
        }
    }
}

/// Directory of persisted ledgers, one JSON file per task.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    dir: PathBuf,
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the file path for a task's ledger.
    pub fn path_for(&self, task_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", task_id))
    }

    /// Save the ledger to disk.
    pub fn save(&self, ledger: &AttemptLedger) -> CoreResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(ledger.task.id);
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        debug!("Saved attempt ledger to {:?}", path);
        Ok(path)
    }

    /// Load a task's ledger.
    pub fn load(&self, task_id: Uuid) -> CoreResult<AttemptLedger> {
        Self::load_path(&self.path_for(task_id))
    }

    /// Load a ledger from an explicit path.
    pub fn load_path(path: &Path) -> CoreResult<AttemptLedger> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// Write every generated artifact as `<slug>_attempt_<n>.<extension>`.
///
/// Attempts without an artifact are skipped.
pub fn write_artifacts(
    task: &Task,
    attempts: &[Attempt],
    extension: &str,
    dir: &Path,
) -> CoreResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let slug = task.slug();
    let mut written = Vec::new();

    for attempt in attempts {
        let Some(artifact) = &attempt.artifact else {
            continue;
        };
        let path = dir.join(format!("{}_attempt_{}.{}", slug, attempt.sequence, extension));
        fs::write(&path, artifact)?;
        written.push(path);
    }

    info!("Wrote {} artifact(s) to {:?}", written.len(), dir);
    Ok(written)
}
