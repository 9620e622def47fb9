//! Progress observers.
//!
//! The orchestrator reports every state transition through a
//! [`ProgressObserver`]. Observers must not block; a panicking observer is
//! contained and does not affect the healing run.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::attempt::Verdict;

/// Orchestrator state for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingState {
    Generating,
    Executing,
    Classifying,
    Succeeded,
    Retrying,
    Failed,
}

impl HealingState {
    /// Whether the task ends in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for HealingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Generating => "generating",
            Self::Executing => "executing",
            Self::Classifying => "classifying",
            Self::Succeeded => "succeeded",
            Self::Retrying => "retrying",
            Self::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// One state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: Uuid,
    /// 1-based attempt the event belongs to
    pub attempt: u32,
    pub max_attempts: u32,
    pub state: HealingState,
    /// Verdict of the attempt, once classified
    pub verdict: Option<Verdict>,
    /// Error summary, when the attempt failed
    pub summary: Option<String>,
}

/// Receiver of progress events.
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Observer that logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        match (&event.verdict, &event.summary) {
            (Some(verdict), Some(summary)) if !summary.is_empty() => info!(
                task_id = %event.task_id,
                attempt = event.attempt,
                "Attempt {}/{} {}: {} ({})",
                event.attempt, event.max_attempts, event.state, verdict, summary
            ),
            (Some(verdict), _) => info!(
                task_id = %event.task_id,
                attempt = event.attempt,
                "Attempt {}/{} {}: {}",
                event.attempt, event.max_attempts, event.state, verdict
            ),
            _ => info!(
                task_id = %event.task_id,
                attempt = event.attempt,
                "Attempt {}/{} {}",
                event.attempt, event.max_attempts, event.state
            ),
        }
    }
}

/// Observer that forwards events into a bounded channel.
///
/// Events are dropped when the channel is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_event(&self, event: &ProgressEvent) {
        if let Err(e) = self.tx.try_send(event.clone()) {
            debug!("Dropping progress event: {}", e);
        }
    }
}

/// Deliver an event, containing any panic raised by the observer.
pub(crate) fn notify(observer: &dyn ProgressObserver, event: &ProgressEvent) {
    if catch_unwind(AssertUnwindSafe(|| observer.on_event(event))).is_err() {
        warn!(
            "Progress observer panicked on {} event for attempt {}",
            event.state, event.attempt
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn event(state: HealingState) -> ProgressEvent {
        ProgressEvent {
            task_id: Uuid::new_v4(),
            attempt: 1,
            max_attempts: 3,
            state,
            verdict: None,
            summary: None,
        }
    }

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = move |e: &ProgressEvent| sink.lock().push(e.state);

        notify(&observer, &event(HealingState::Generating));
        notify(&observer, &event(HealingState::Executing));

        assert_eq!(
            *seen.lock(),
            vec![HealingState::Generating, HealingState::Executing]
        );
    }

    #[test]
    fn test_panicking_observer_is_contained() {
        let observer = |_: &ProgressEvent| panic!("observer failure");
        notify(&observer, &event(HealingState::Failed));
    }

    #[tokio::test]
    async fn test_channel_observer_drops_when_full() {
        let (observer, mut rx) = ChannelObserver::new(1);

        observer.on_event(&event(HealingState::Generating));
        observer.on_event(&event(HealingState::Executing));

        assert_eq!(rx.recv().await.unwrap().state, HealingState::Generating);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(HealingState::Succeeded.is_terminal());
        assert!(HealingState::Failed.is_terminal());
        assert!(!HealingState::Retrying.is_terminal());
    }
}
