//! Process-backed sandbox.
//!
//! Runs build, run and test steps as child processes inside a per-attempt working
//! directory. Each child is placed in its own process group so that a
//! timeout or cancellation can kill the whole tree, and every child is reaped
//! before the step returns.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::profiles::LanguageProfile;
use crate::report::{ExecutionReport, StepKind, StepResult};
use crate::runner::Sandbox;
use crate::workspace::Workdir;

/// How long to wait for output readers after the child is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

enum StepOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Sandbox that executes steps as local child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Format command for logging.
    fn format_command(args: &[String]) -> String {
        args.iter()
            .map(|arg| {
                if arg.contains(' ') {
                    format!("'{}'", arg)
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run_step(
        &self,
        step: StepKind,
        args: Vec<String>,
        profile: &LanguageProfile,
        workdir: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> RunnerResult<StepResult> {
        let command_line = Self::format_command(&args);
        let (program, rest) = args.split_first().ok_or_else(|| RunnerError::Spawn {
            step: step.to_string(),
            command: String::new(),
            message: "empty command".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .current_dir(workdir)
            .envs(&profile.env)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        debug!("Executing {} step: {}", step, command_line);

        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = cmd.spawn().map_err(|e| RunnerError::Spawn {
            step: step.to_string(),
            command: command_line.clone(),
            message: e.to_string(),
        })?;
        let pid = child.id();

        let limit = self.config.output_limit;
        let stdout_task = child.stdout.take().map(|out| tokio::spawn(read_tail(out, limit)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(read_tail(err, limit)));

        let outcome = tokio::select! {
            status = child.wait() => StepOutcome::Exited(status),
            _ = tokio::time::sleep(timeout) => StepOutcome::TimedOut,
            _ = cancel.cancelled() => StepOutcome::Cancelled,
        };

        let (exit_code, timed_out) = match outcome {
            StepOutcome::Exited(Ok(status)) => {
                // Stragglers left in the group would otherwise outlive the step.
                kill_process_group(pid);
                (status.code(), false)
            }
            StepOutcome::Exited(Err(e)) => {
                terminate(&mut child, pid).await;
                return Err(RunnerError::Io(e));
            }
            StepOutcome::TimedOut => {
                warn!(
                    "{} step exceeded {:?}, killing process group: {}",
                    step, timeout, command_line
                );
                terminate(&mut child, pid).await;
                (None, true)
            }
            StepOutcome::Cancelled => {
                info!("{} step cancelled: {}", step, command_line);
                terminate(&mut child, pid).await;
                return Err(RunnerError::Cancelled);
            }
        };

        let stdout = collect_output(stdout_task).await;
        let stderr = collect_output(stderr_task).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match exit_code {
            Some(0) => info!("{} step completed in {}ms", step, duration_ms),
            Some(code) => warn!(
                "{} step failed with exit code {} after {}ms",
                step, code, duration_ms
            ),
            None if !timed_out => warn!("{} step terminated by signal", step),
            None => {}
        }

        Ok(StepResult {
            step,
            command: args,
            exit_code,
            stdout,
            stderr,
            timed_out,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        })
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
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

        let workdir = Workdir::create(work_root)?;
        workdir.materialize(profile, artifact)?;

        info!(
            "Running {} artifact in {:?} (timeout {:?})",
            profile.language,
            workdir.path(),
            timeout
        );

        let mut report = ExecutionReport::new(workdir.path().to_path_buf(), timeout);

        if let Some(build) = &profile.build {
            let args = build.render(&profile.entry_file, workdir.path());
            let result = self
                .run_step(StepKind::Build, args, profile, workdir.path(), timeout, cancel)
                .await?;
            let built = result.success();
            report.build = Some(result);

            if !built {
                workdir.close();
                return Ok(report);
            }
        }

        let args = profile.run.render(&profile.entry_file, workdir.path());
        let result = self
            .run_step(StepKind::Run, args, profile, workdir.path(), timeout, cancel)
            .await?;
        let ran = result.success();
        report.run = Some(result);

        if let Some(test) = profile.test_command(artifact).filter(|_| ran) {
            let args = test.render(&profile.entry_file, workdir.path());
            let result = self
                .run_step(StepKind::Test, args, profile, workdir.path(), timeout, cancel)
                .await?;
            report.test = Some(result);
        }

        workdir.close();
        Ok(report)
    }
}

/// Kill the process group, then the child itself, and reap it.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_process_group(pid);
    if let Err(e) = child.kill().await {
        debug!("Child kill returned: {}", e);
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Read a stream to the end, keeping at most `limit` trailing bytes.
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > limit.saturating_mul(2) {
                    let excess = buf.len() - limit;
                    buf.drain(..excess);
                }
            }
            Err(e) => {
                debug!("Output stream read failed: {}", e);
                break;
            }
        }
    }

    if buf.len() > limit {
        let excess = buf.len() - limit;
        buf.drain(..excess);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect_output(task: Option<JoinHandle<String>>) -> String {
    let Some(handle) = task else {
        return String::new();
    };
    let abort = handle.abort_handle();

    match tokio::time::timeout(READER_GRACE, handle).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Output reader failed: {}", e);
            String::new()
        }
        Err(_) => {
            warn!("Output reader did not finish within {:?}", READER_GRACE);
            abort.abort();
            String::new()
        }
    }
}
