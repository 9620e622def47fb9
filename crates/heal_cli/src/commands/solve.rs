//! Solve command - Generate, run and heal code for one request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use heal_core::{
    write_artifacts, FeedbackPolicy, Generator, HealingConfig, HealingOrchestrator,
    HealingResult, NullObserver, ProgressObserver, Task,
};
use heal_llm::{CannedGenerator, OpenAiGenerator};
use heal_runner::{LanguageProfile, ProcessSandbox, SandboxConfig};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::console::ConsoleObserver;

/// The attempt budget ran out without a working program.
#[derive(Debug, Error)]
#[error("healing failed after {attempts} attempt(s)")]
pub struct HealingFailed {
    pub attempts: usize,
}

#[derive(Args)]
pub struct SolveArgs {
    /// What to build, in plain language
    pub request: String,

    /// Target language (inferred from the request when omitted)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Maximum number of attempts
    #[arg(short = 'n', long)]
    pub max_attempts: Option<u32>,

    /// Per-step timeout in seconds (language default when omitted)
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Directory for per-attempt working directories
    #[arg(long)]
    pub work_root: Option<PathBuf>,

    /// Persist the attempt ledger as JSON in this directory
    #[arg(long)]
    pub ledger_dir: Option<PathBuf>,

    /// Write every generated attempt to this directory
    #[arg(long)]
    pub save_artifacts: Option<PathBuf>,

    /// Feedback given on retries: latest or cumulative
    #[arg(long, value_parser = parse_feedback)]
    pub feedback: Option<FeedbackPolicy>,

    /// Load settings from a TOML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use built-in programs instead of calling the model API
    #[arg(long)]
    pub offline: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_feedback(value: &str) -> Result<FeedbackPolicy, String> {
    value.parse().map_err(|e: heal_core::CoreError| e.to_string())
}

impl SolveArgs {
    /// Merge the config file (if any) with command-line overrides.
    fn healing_config(&self) -> Result<HealingConfig> {
        let mut config = match &self.config {
            Some(path) => HealingConfig::from_file(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => HealingConfig::default(),
        };

        if let Some(n) = self.max_attempts {
            config = config.with_max_attempts(n);
        }
        if let Some(secs) = self.timeout {
            config.step_timeout_secs = Some(secs);
        }
        if let Some(dir) = &self.work_root {
            config = config.with_work_root(dir);
        }
        if let Some(dir) = &self.ledger_dir {
            config = config.with_ledger_dir(dir);
        }
        if let Some(policy) = self.feedback {
            config = config.with_feedback(policy);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Pick the model-backed generator, or the offline one.
pub(crate) fn select_generator(offline: bool) -> Arc<dyn Generator> {
    if offline {
        return Arc::new(CannedGenerator::new());
    }
    match OpenAiGenerator::from_env() {
        Ok(generator) => {
            info!("Using model {}", generator.model());
            Arc::new(generator)
        }
        Err(e) => {
            warn!("{}; falling back to built-in programs", e);
            Arc::new(CannedGenerator::new())
        }
    }
}

pub async fn execute(args: SolveArgs, cancel: CancellationToken) -> Result<()> {
    let config = args.healing_config()?;
    let task = match &args.language {
        Some(language) => Task::new(args.request.clone(), language.clone()),
        None => Task::infer(args.request.clone()),
    };
    let profile = heal_runner::resolve(&task.language).map_err(heal_core::CoreError::from)?;

    let observer: Arc<dyn ProgressObserver> = if args.json {
        Arc::new(NullObserver)
    } else {
        println!("Task: {}", task.request);
        println!("Language: {}", profile.display_name);
        println!("{}", "=".repeat(60));
        Arc::new(ConsoleObserver)
    };

    let sandbox = ProcessSandbox::new(SandboxConfig::default());
    let orchestrator = HealingOrchestrator::new(select_generator(args.offline), Arc::new(sandbox))
        .with_config(config)
        .with_observer(observer);

    let result = orchestrator.heal_with_cancel(&task, &cancel).await?;

    if let Some(dir) = &args.save_artifacts {
        let written = write_artifacts(&task, &result.attempts, &profile.extension, dir)
            .with_context(|| format!("Failed to save artifacts to {:?}", dir))?;
        if !args.json {
            for path in written {
                println!("Saved {}", path.display());
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, profile);
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(HealingFailed {
            attempts: result.attempts.len(),
        }
        .into())
    }
}

pub(crate) fn print_summary(result: &HealingResult, profile: &LanguageProfile) {
    let elapsed = Duration::from_millis(result.elapsed_ms);
    println!();

    match result.winner() {
        Some(winner) => {
            println!(
                "SUCCESS after {} attempt(s) in {:.1}s",
                result.attempts.len(),
                elapsed.as_secs_f64()
            );
            if let Some(code) = &winner.artifact {
                println!("\n--- {} ---\n{}", profile.entry_file, code.trim_end());
            }
            if let Some(output) = winner.output().filter(|o| !o.trim().is_empty()) {
                println!("\n--- output ---\n{}", output.trim_end());
            }
        }
        None => {
            println!(
                "FAILED after {} attempt(s) in {:.1}s",
                result.attempts.len(),
                elapsed.as_secs_f64()
            );
            if let Some(error) = result.last_error() {
                println!("\nLast error:\n{}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SolveArgs,
    }

    #[test]
    fn test_overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heal.toml");
        std::fs::write(&path, "max_attempts = 5\nsummary_limit = 500\n").unwrap();

        let harness = Harness::parse_from([
            "heal",
            "print hello",
            "--config",
            path.to_str().unwrap(),
            "--max-attempts",
            "2",
            "--timeout",
            "1.5",
        ]);
        let config = harness.args.healing_config().unwrap();

        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.summary_limit, 500);
        assert_eq!(config.step_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let harness = Harness::parse_from(["heal", "x", "--max-attempts", "0"]);
        let err = harness.args.healing_config().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<heal_core::CoreError>(),
            Some(heal_core::CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_feedback_value() {
        assert!(Harness::try_parse_from(["heal", "x", "--feedback", "everything"]).is_err());
    }
}
