//! Console progress output.

use heal_core::{HealingState, ProgressEvent, ProgressObserver};

/// Prints attempt progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    fn line(event: &ProgressEvent) -> Option<String> {
        let prefix = format!("[{}/{}]", event.attempt, event.max_attempts);
        match event.state {
            HealingState::Generating => Some(format!("{} Generating code...", prefix)),
            HealingState::Executing => Some(format!("{} Building and running...", prefix)),
            HealingState::Classifying => None,
            HealingState::Succeeded => Some(format!("{} Success", prefix)),
            HealingState::Retrying | HealingState::Failed => {
                let verdict = event
                    .verdict
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "failed".to_string());
                let mut line = format!("{} Failed: {}", prefix, verdict);
                if let Some(summary) = &event.summary {
                    for detail in summary.lines().take(8) {
                        line.push_str("\n      ");
                        line.push_str(detail);
                    }
                }
                if event.state == HealingState::Retrying {
                    line.push_str("\n      Retrying with the error as feedback");
                }
                Some(line)
            }
        }
    }
}

impl ProgressObserver for ConsoleObserver {
    fn on_event(&self, event: &ProgressEvent) {
        if let Some(line) = Self::line(event) {
            println!("{}", line);
        }
    }
}
