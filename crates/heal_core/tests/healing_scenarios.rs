//! End-to-end healing scenarios.
//!
//! Scripted scenarios use the mock sandbox. Real-process scenarios use the
//! shell profile; python- and cargo-backed ones are skipped when the
//! toolchain is missing.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use heal_core::{
    CoreError, GenerationError, HealingConfig, HealingOrchestrator, ScriptedGenerator, Task,
    TaskStatus, Verdict,
};
use heal_runner::{MockOutcome, MockSandbox, ProcessSandbox, SandboxConfig};

fn mock_orchestrator(generator: ScriptedGenerator, sandbox: MockSandbox) -> HealingOrchestrator {
    HealingOrchestrator::new(Arc::new(generator), Arc::new(sandbox))
}

fn process_orchestrator(generator: ScriptedGenerator, work_root: &Path) -> HealingOrchestrator {
    let sandbox = ProcessSandbox::new(SandboxConfig::default());
    HealingOrchestrator::new(Arc::new(generator), Arc::new(sandbox))
        .with_config(HealingConfig::default().with_work_root(work_root))
}

fn toolchain_available(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

fn verdicts(attempts: &[heal_core::Attempt]) -> Vec<Verdict> {
    attempts.iter().map(|a| a.verdict).collect()
}

#[tokio::test]
async fn test_first_attempt_success() {
    let orchestrator = mock_orchestrator(
        ScriptedGenerator::new().respond("print('hello')"),
        MockSandbox::new().add_outcome(MockOutcome::success("hello\n")),
    );

    let result = orchestrator.heal(&Task::new("print hello", "python")).await.unwrap();

    assert_eq!(result.status, TaskStatus::Success);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].sequence, 1);
    assert_eq!(result.language, "python");
}

#[tokio::test]
async fn test_compile_errors_then_success() {
    let generator = ScriptedGenerator::new()
        .respond("fn main() { let x: i32 = \"a\"; }")
        .respond("fn main() { println!(\"{}\", y); }")
        .respond("fn main() { println!(\"ok\"); }");
    let sandbox = MockSandbox::new().with_outcomes(vec![
        MockOutcome::compile_error("error[E0308]: mismatched types"),
        MockOutcome::compile_error("error[E0425]: cannot find value `y` in this scope"),
        MockOutcome::success("ok\n"),
    ]);
    let orchestrator = mock_orchestrator(generator.clone(), sandbox);

    let result = orchestrator
        .heal(&Task::new("write quicksort in Rust", "rust"))
        .await
        .unwrap();

    assert_eq!(result.status, TaskStatus::Success);
    assert_eq!(
        verdicts(&result.attempts),
        vec![Verdict::CompileError, Verdict::CompileError, Verdict::Success]
    );
    assert_eq!(
        result.attempts.iter().map(|a| a.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let requests = generator.requests();
    assert!(requests[0].feedback.is_none());
    assert_eq!(requests[1].feedback.as_deref(), Some("error[E0308]: mismatched types"));
    assert!(requests[2].feedback.as_deref().unwrap().contains("E0425"));
}

#[tokio::test]
async fn test_timeouts_exhaust_budget() {
    let sandbox = MockSandbox::new().add_outcome(MockOutcome::timeout());
    let orchestrator = mock_orchestrator(ScriptedGenerator::new().respond("while True: pass"), sandbox.clone())
        .with_config(HealingConfig::default().with_max_attempts(3));

    let result = orchestrator.heal(&Task::new("spin", "python")).await.unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.winner().is_none());
    assert_eq!(verdicts(&result.attempts), vec![Verdict::Timeout; 3]);
    assert_eq!(sandbox.call_count(), 3);
    assert!(result.attempts[0].error_summary.starts_with("execution exceeded"));
}

#[tokio::test]
async fn test_unsupported_language() {
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let generator = ScriptedGenerator::new().respond("DISPLAY 'HI'.");
    let orchestrator = process_orchestrator(generator.clone(), &work_root);

    let err = orchestrator
        .heal(&Task::new("hello world", "cobol"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UnsupportedLanguage(ref name) if name == "cobol"));
    assert_eq!(generator.call_count(), 0);
    assert!(!work_root.exists());
}

#[tokio::test]
async fn test_generator_error_then_success() {
    let generator = ScriptedGenerator::new()
        .fail(GenerationError::Unavailable("connection refused".to_string()))
        .respond("print('hi')");
    let sandbox = MockSandbox::new().add_outcome(MockOutcome::success("hi\n"));
    let orchestrator = mock_orchestrator(generator, sandbox.clone());

    let result = orchestrator.heal(&Task::new("say hi", "python")).await.unwrap();

    assert_eq!(
        verdicts(&result.attempts),
        vec![Verdict::GeneratorError, Verdict::Success]
    );
    assert!(result.attempts[0].artifact.is_none());
    assert!(result.attempts[0].error_summary.contains("connection refused"));
    assert_eq!(sandbox.call_count(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_shell_heals_and_cleans_up() {
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let generator = ScriptedGenerator::new()
        .respond("echo 'missing input' >&2\nexit 1\n")
        .respond("if then fi (\n")
        .respond("echo healed\n");
    let orchestrator = process_orchestrator(generator, &work_root);

    let result = orchestrator.heal(&Task::new("say healed", "sh")).await.unwrap();

    assert_eq!(
        verdicts(&result.attempts),
        vec![Verdict::RuntimeError, Verdict::CompileError, Verdict::Success]
    );
    assert_eq!(result.attempts[0].error_summary, "missing input");
    assert_eq!(result.winner().unwrap().output().map(str::trim), Some("healed"));
    assert_eq!(entries(&work_root), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_timeout_is_enforced() {
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let orchestrator = process_orchestrator(ScriptedGenerator::new().respond("sleep 30\n"), &work_root)
        .with_config(
            HealingConfig::default()
                .with_work_root(&work_root)
                .with_max_attempts(2)
                .with_step_timeout(Duration::from_millis(300)),
        );

    let started = Instant::now();
    let result = orchestrator.heal(&Task::new("hang", "sh")).await.unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(verdicts(&result.attempts), vec![Verdict::Timeout; 2]);
    assert_eq!(result.attempts[0].error_summary, "execution exceeded 0.3s");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(entries(&work_root), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_concurrent_tasks_do_not_interfere() {
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let sandbox = Arc::new(ProcessSandbox::default());
    let config = HealingConfig::default().with_work_root(&work_root);

    let first = HealingOrchestrator::new(
        Arc::new(ScriptedGenerator::new().respond("echo one > out.txt\ncat out.txt\n")),
        sandbox.clone(),
    )
    .with_config(config.clone());
    let second = HealingOrchestrator::new(
        Arc::new(ScriptedGenerator::new().respond("echo two > out.txt\ncat out.txt\n")),
        sandbox,
    )
    .with_config(config);

    let task_one = Task::new("one", "sh");
    let task_two = Task::new("two", "sh");
    let (a, b) = tokio::join!(first.heal(&task_one), second.heal(&task_two));

    assert_eq!(a.unwrap().winner().unwrap().output().map(str::trim), Some("one"));
    assert_eq!(b.unwrap().winner().unwrap().output().map(str::trim), Some("two"));
    assert_eq!(entries(&work_root), 0);
}

#[tokio::test]
async fn test_real_python_scenarios() {
    if !toolchain_available("python3") {
        eprintln!("python3 not found, skipping");
        return;
    }

    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let generator = ScriptedGenerator::new()
        .respond("print('unclosed'\n")
        .respond("print(1 / 0)\n")
        .respond("print('hello')\n");
    let orchestrator = process_orchestrator(generator, &work_root);

    let result = orchestrator.heal(&Task::new("print hello", "python")).await.unwrap();

    assert_eq!(
        verdicts(&result.attempts),
        vec![Verdict::CompileError, Verdict::RuntimeError, Verdict::Success]
    );
    assert!(result.attempts[0].error_summary.contains("SyntaxError"));
    assert!(result.attempts[1].error_summary.contains("ZeroDivisionError"));
    assert_eq!(result.winner().unwrap().output().map(str::trim), Some("hello"));
    assert_eq!(entries(&work_root), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_configured_work_root_is_used() {
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("configured");
    let orchestrator = HealingOrchestrator::new(
        Arc::new(ScriptedGenerator::new().respond("pwd\n")),
        Arc::new(ProcessSandbox::default()),
    )
    .with_config(HealingConfig::default().with_work_root(&work_root));

    let result = orchestrator.heal(&Task::new("where am i", "sh")).await.unwrap();

    let cwd = result.winner().unwrap().output().unwrap().trim().to_string();
    let parent = Path::new(&cwd).parent().unwrap().canonicalize().unwrap();
    assert_eq!(parent, work_root.canonicalize().unwrap());
    assert_eq!(entries(&work_root), 0);
}

#[tokio::test]
async fn test_real_python_failing_unittest_is_healed() {
    if !toolchain_available("python3") {
        eprintln!("python3 not found, skipping");
        return;
    }

    let broken = "import unittest\n\n\ndef add(a, b):\n    return a - b\n\n\nclass AddTest(unittest.TestCase):\n    def test_add(self):\n        self.assertEqual(add(1, 2), 3)\n\n\nif __name__ == \"__main__\":\n    print(add(1, 2))\n";
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let generator = ScriptedGenerator::new()
        .respond(broken)
        .respond(broken.replace("a - b", "a + b"));
    let orchestrator = process_orchestrator(generator, &work_root);

    let result = orchestrator.heal(&Task::new("add two numbers", "python")).await.unwrap();

    assert_eq!(
        verdicts(&result.attempts),
        vec![Verdict::RuntimeError, Verdict::Success]
    );
    assert!(result.attempts[0].error_summary.contains("AssertionError"));
    assert!(result.attempts[0].test.is_some());
    assert_eq!(entries(&work_root), 0);
}

#[tokio::test]
async fn test_real_rust_failing_test_is_not_success() {
    if !toolchain_available("cargo") {
        eprintln!("cargo not found, skipping");
        return;
    }

    let code = "fn add(a: i32, b: i32) -> i32 {\n    a - b\n}\n\nfn main() {\n    println!(\"{}\", add(1, 2));\n}\n\n#[cfg(test)]\nmod tests {\n    use super::*;\n\n    #[test]\n    fn adds() {\n        assert_eq!(add(1, 2), 3);\n    }\n}\n";
    let scratch = tempfile::tempdir().unwrap();
    let work_root = scratch.path().join("work");
    let orchestrator = process_orchestrator(ScriptedGenerator::new().respond(code), &work_root)
        .with_config(
            HealingConfig::default()
                .with_work_root(&work_root)
                .with_max_attempts(1),
        );

    let result = orchestrator.heal(&Task::new("add two numbers", "rust")).await.unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(verdicts(&result.attempts), vec![Verdict::RuntimeError]);
    assert!(result.attempts[0].run.as_ref().unwrap().success());
    assert!(result.attempts[0].error_summary.contains("adds"));
}
