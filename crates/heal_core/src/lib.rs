//! # heal_core
//!
//! The self-healing loop of selfheal.
//!
//! A [`Task`] is a natural-language request plus a target language. The
//! [`HealingOrchestrator`] asks a [`Generator`] for code, runs it through a
//! [`heal_runner::Sandbox`], classifies the outcome and, on failure, feeds
//! the error back into the next generation until an attempt succeeds or the
//! attempt budget runs out.
//!
//! # Architecture
//!
//! - **Classifier**: Maps an execution report to a [`Verdict`] and error summary
//! - **Orchestrator**: Explicit state machine driven by the [`decide`] transition table
//! - **Ledger**: Append-only attempt history, optionally persisted as JSON
//! - **Observers**: Progress events at every state transition
//! - **Metrics**: Attempt and task counters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use heal_core::{HealingConfig, HealingOrchestrator, Task, TracingObserver};
//! use heal_runner::{ProcessSandbox, SandboxConfig};
//!
//! let orchestrator = HealingOrchestrator::new(Arc::new(my_generator), Arc::new(ProcessSandbox::default()))
//!     .with_config(HealingConfig::default().with_max_attempts(3))
//!     .with_observer(Arc::new(TracingObserver));
//!
//! let result = orchestrator.heal(&Task::infer("write quicksort in Rust")).await?;
//! println!("{} after {} attempts", result.status, result.attempts.len());
//! ```

pub mod attempt;
pub mod classifier;
pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod metrics;
pub mod observer;
pub mod orchestrator;
pub mod task;

pub use attempt::{Attempt, HealingResult, TaskStatus, Verdict};
pub use classifier::{classify, summarize, Classification, DEFAULT_SUMMARY_LIMIT};
pub use config::{FeedbackPolicy, HealingConfig, DEFAULT_MAX_ATTEMPTS};
pub use error::{CoreError, CoreResult};
pub use generator::{GenerationError, GenerationRequest, Generator, ScriptedGenerator};
pub use ledger::{write_artifacts, AttemptLedger, LedgerStore};
pub use metrics::{InMemoryMetrics, MetricsSink, MetricsSnapshot, NoopMetrics};
pub use observer::{ChannelObserver, HealingState, NullObserver, ProgressEvent, ProgressObserver, TracingObserver};
pub use orchestrator::{decide, HealingOrchestrator, Transition};
pub use task::{detect_language, Task, DEFAULT_LANGUAGE};
