//! # heal_runner
//!
//! Sandboxed execution of generated code for selfheal.
//!
//! This crate knows how to turn a code artifact into a build step and a run
//! step for a given language (plus a test step when the artifact carries
//! tests), execute them in a throwaway working directory with a wall-clock
//! timeout, and report what happened.
//!
//! # Features
//!
//! - **Language Profiles**: Static table of build/run/test commands per language
//! - **Process Sandbox**: Child processes in their own process group, killed on timeout
//! - **Scoped Workdirs**: One fresh directory per attempt, removed on every exit path
//! - **Mock Sandbox**: Scripted outcomes for tests without spawning processes
//!
//! # Example
//!
//! ```rust,no_run
//! use heal_runner::{default_work_root, resolve, ProcessSandbox, Sandbox, SandboxConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sandbox = ProcessSandbox::new(SandboxConfig::default());
//!     let profile = resolve("python")?;
//!
//!     let report = sandbox
//!         .run(
//!             profile,
//!             "print('hello')",
//!             &default_work_root(),
//!             profile.timeout,
//!             &CancellationToken::new(),
//!         )
//!         .await?;
//!     println!("Run step: {:?}", report.run.map(|r| r.exit_code));
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod process;
pub mod profiles;
pub mod report;
pub mod runner;
pub mod workspace;

pub use config::{default_work_root, SandboxConfig};
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedRun, MockOutcome, MockSandbox, MockStep};
pub use process::ProcessSandbox;
pub use profiles::{
    resolve, CommandTemplate, Language, LanguageProfile, ProfileRegistry, ProjectLayout, TestStep,
};
pub use report::{ExecutionReport, StepKind, StepResult};
pub use runner::Sandbox;
pub use workspace::Workdir;
