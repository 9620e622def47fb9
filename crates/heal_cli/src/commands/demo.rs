//! Demo command - Run the built-in example tasks offline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use heal_core::{
    HealingConfig, HealingOrchestrator, InMemoryMetrics, Task, DEFAULT_LANGUAGE,
};
use heal_llm::CannedGenerator;
use heal_runner::{ProcessSandbox, SandboxConfig};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::languages::toolchain_available;
use super::solve::{print_summary, HealingFailed};
use crate::console::ConsoleObserver;

/// Example tasks run by the demo.
pub const DEMO_TASKS: &[&str] = &[
    "write quicksort in Rust",
    "create a binary search tree in Python",
    "implement fibonacci with memoization in Python",
];

#[derive(Args)]
pub struct DemoArgs {
    /// Maximum number of attempts per task
    #[arg(short = 'n', long, default_value_t = heal_core::DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Directory for per-attempt working directories
    #[arg(long)]
    pub work_root: Option<PathBuf>,
}

/// Build a demo task, switching to the default language when the requested
/// toolchain is missing.
fn demo_task(request: &str) -> Task {
    let task = Task::infer(request);
    match heal_runner::resolve(&task.language) {
        Ok(profile) if !toolchain_available(profile) => {
            warn!(
                "{} toolchain not found, switching to {}",
                profile.display_name, DEFAULT_LANGUAGE
            );
            let request = request.replace(&profile.display_name, "Python");
            Task::new(request, DEFAULT_LANGUAGE)
        }
        _ => task,
    }
}

pub async fn execute(args: DemoArgs, cancel: CancellationToken) -> Result<()> {
    let mut config = HealingConfig::default().with_max_attempts(args.max_attempts);
    if let Some(dir) = args.work_root {
        config = config.with_work_root(dir);
    }
    config.validate()?;

    let metrics = Arc::new(InMemoryMetrics::new());
    let sandbox = ProcessSandbox::new(SandboxConfig::default());
    let orchestrator = HealingOrchestrator::new(Arc::new(CannedGenerator::new()), Arc::new(sandbox))
        .with_config(config)
        .with_observer(Arc::new(ConsoleObserver))
        .with_metrics(metrics.clone());

    for request in DEMO_TASKS {
        let task = demo_task(request);
        let profile = heal_runner::resolve(&task.language).map_err(heal_core::CoreError::from)?;

        println!("\n{}", "=".repeat(60));
        println!("Task: {}", task.request);
        println!("Language: {}", profile.display_name);
        println!("{}", "=".repeat(60));

        let result = orchestrator.heal_with_cancel(&task, &cancel).await?;
        print_summary(&result, profile);
    }

    let snapshot = metrics.snapshot();
    println!("\n{}", "=".repeat(60));
    println!(
        "Tasks: {}  Succeeded: {}  Failed: {}  Attempts: {}  Success rate: {:.0}%",
        snapshot.tasks,
        snapshot.successes,
        snapshot.failures,
        snapshot.attempts,
        snapshot.success_rate() * 100.0
    );

    if snapshot.failures > 0 {
        return Err(HealingFailed {
            attempts: snapshot.attempts as usize,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_tasks_have_built_in_programs() {
        let generator = CannedGenerator::new();
        for request in DEMO_TASKS {
            let task = demo_task(request);
            let language = heal_runner::resolve(&task.language).unwrap().language;
            assert!(generator.supports(&task.request, language), "{}", request);
        }
    }
}
