//! Sandbox trait.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RunnerResult;
use crate::profiles::LanguageProfile;
use crate::report::ExecutionReport;

/// Executes a generated artifact's build and run steps in isolation.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Materialize `artifact` in a fresh working directory under `work_root`,
    /// build it if the profile has a build step, run it, then run the
    /// profile's test step when the artifact carries tests. Each step is
    /// bounded by `timeout`. The working directory is gone when this returns.
    ///
    /// Returns [`RunnerError::Cancelled`](crate::RunnerError::Cancelled) when
    /// `cancel` fires; any in-flight child has been killed by then.
    async fn run(
        &self,
        profile: &LanguageProfile,
        artifact: &str,
        work_root: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> RunnerResult<ExecutionReport>;
}
