//! Outcome classification.
//!
//! Turns a sandbox [`ExecutionReport`] into a [`Verdict`] and a short error
//! summary suitable for feeding back into generation. Classification is a
//! pure function of the report and the language profile.

use std::time::Duration;

use heal_runner::{ExecutionReport, LanguageProfile, StepResult};

use crate::attempt::Verdict;

/// Default maximum summary length in characters.
pub const DEFAULT_SUMMARY_LIMIT: usize = 2000;

/// Verdict plus failure summary for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub summary: String,
}

impl Classification {
    fn new(verdict: Verdict, summary: String) -> Self {
        Self { verdict, summary }
    }

    fn success() -> Self {
        Self::new(Verdict::Success, String::new())
    }
}

/// Classify a sandbox report.
pub fn classify(
    profile: &LanguageProfile,
    report: &ExecutionReport,
    summary_limit: usize,
) -> Classification {
    if report.timed_out() {
        return Classification::new(
            Verdict::Timeout,
            format!("execution exceeded {}", format_timeout(report.timeout)),
        );
    }

    if let Some(build) = report.build.as_ref().filter(|b| !b.success()) {
        return Classification::new(Verdict::CompileError, failure_summary(build, summary_limit));
    }

    let Some(run) = &report.run else {
        return Classification::new(
            Verdict::RuntimeError,
            "no run step was executed".to_string(),
        );
    };

    if !run.success() {
        return Classification::new(step_verdict(profile, run), failure_summary(run, summary_limit));
    }

    match report.test.as_ref().filter(|t| !t.success()) {
        // Test harnesses report assertion failures on stdout.
        Some(test) => Classification::new(
            step_verdict(profile, test),
            summarize_or_status(test, &test.combined_output(), summary_limit),
        ),
        None => Classification::success(),
    }
}

/// CompileError when the output carries a compile marker, else RuntimeError.
fn step_verdict(profile: &LanguageProfile, step: &StepResult) -> Verdict {
    if profile.matches_compile_marker(&step.stderr) || profile.matches_compile_marker(&step.stdout)
    {
        Verdict::CompileError
    } else {
        Verdict::RuntimeError
    }
}

/// Summary for a failed step: stderr, falling back to stdout, falling back
/// to a description of the exit status.
fn failure_summary(step: &StepResult, limit: usize) -> String {
    let source = if !step.stderr.trim().is_empty() {
        &step.stderr
    } else {
        &step.stdout
    };

    summarize_or_status(step, source, limit)
}

fn summarize_or_status(step: &StepResult, output: &str, limit: usize) -> String {
    let summary = summarize(output, limit);
    if !summary.is_empty() || limit == 0 {
        return summary;
    }

    match step.exit_code {
        Some(code) => format!("{} step exited with code {}", step.step, code),
        None => format!("{} step was terminated by a signal", step.step),
    }
}

/// Collapse repeated lines and keep the tail of `text` within `limit` chars.
///
/// The tail starts at a line boundary whenever one falls inside the window.
pub fn summarize(text: &str, limit: usize) -> String {
    if limit == 0 {
        return String::new();
    }

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if lines.last() != Some(&line) {
            lines.push(line);
        }
    }

    let joined = lines.join("\n");
    let collapsed = joined.trim();
    let total = collapsed.chars().count();
    if total <= limit {
        return collapsed.to_string();
    }

    let start = collapsed
        .char_indices()
        .nth(total - limit)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let window = &collapsed[start..];

    if collapsed[..start].ends_with('\n') {
        return window.to_string();
    }
    match window.find('\n') {
        Some(pos) if pos + 1 < window.len() => window[pos + 1..].to_string(),
        _ => window.to_string(),
    }
}

fn format_timeout(timeout: Duration) -> String {
    if timeout.subsec_millis() == 0 {
        format!("{}s", timeout.as_secs())
    } else {
        format!("{:.1}s", timeout.as_secs_f64())
    }
}
