//! Language profile registry.
//!
//! Maps a requested language to the commands that build, run and test a
//! generated artifact, the file it is written to, and the markers that
//! identify a compile failure in its output. The table is built once per process and
//! is read-only afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RunnerError, RunnerResult};

/// Supported target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    Go,
    C,
    Cpp,
    Shell,
}

impl Language {
    /// Get all language variants.
    pub fn all() -> &'static [Language] {
        &[
            Language::Python,
            Language::Rust,
            Language::JavaScript,
            Language::Go,
            Language::C,
            Language::Cpp,
            Language::Shell,
        ]
    }

    /// Canonical lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::JavaScript => "javascript",
            Self::Go => "go",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Shell => "shell",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileRegistry::global().resolve(s).map(|p| p.language)
    }
}

/// How an artifact is laid out on disk before building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectLayout {
    /// The artifact is written verbatim to the entry file.
    SingleFile,
    /// The artifact becomes `src/main.rs` of a generated Cargo package.
    Cargo,
}

/// A command line with `{file}` and `{dir}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(args: &[&str]) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The program name (first argument).
    pub fn program(&self) -> &str {
        self.args.first().map(|s| s.as_str()).unwrap_or_default()
    }

    /// Substitute placeholders for a concrete working directory.
    pub fn render(&self, file: &str, dir: &Path) -> Vec<String> {
        let dir = dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{file}", file).replace("{dir}", &dir))
            .collect()
    }
}

impl std::fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Test command used when the artifact matches `marker`.
#[derive(Debug, Clone)]
pub struct TestStep {
    pub command: CommandTemplate,
    marker: Regex,
}

impl TestStep {
    /// Whether the artifact contains tests this command can run.
    pub fn applies_to(&self, artifact: &str) -> bool {
        self.marker.is_match(artifact)
    }
}

/// Build/run/test configuration for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub language: Language,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub extension: String,
    pub entry_file: String,
    pub layout: ProjectLayout,
    pub build: Option<CommandTemplate>,
    pub run: CommandTemplate,
    pub tests: Vec<TestStep>,
    pub timeout: Duration,
    pub env: HashMap<String, String>,
    compile_markers: Vec<Regex>,
}

impl LanguageProfile {
    pub fn new(language: Language, display_name: impl Into<String>, extension: &str) -> Self {
        Self {
            language,
            display_name: display_name.into(),
            aliases: vec![language.as_str().to_string()],
            extension: extension.to_string(),
            entry_file: format!("main.{}", extension),
            layout: ProjectLayout::SingleFile,
            build: None,
            run: CommandTemplate::new(&[]),
            tests: Vec::new(),
            timeout: Duration::from_secs(30),
            env: HashMap::new(),
            compile_markers: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_lowercase());
        self
    }

    pub fn build(mut self, args: &[&str]) -> Self {
        self.build = Some(CommandTemplate::new(args));
        self
    }

    pub fn run(mut self, args: &[&str]) -> Self {
        self.run = CommandTemplate::new(args);
        self
    }

    /// Add a test command, run after a successful run step when `marker`
    /// matches the artifact. The first matching command wins.
    pub fn test(mut self, args: &[&str], marker: &str) -> Self {
        match Regex::new(marker) {
            Ok(marker) => self.tests.push(TestStep {
                command: CommandTemplate::new(args),
                marker,
            }),
            Err(e) => warn!("Ignoring test step with invalid marker {:?}: {}", marker, e),
        }
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Lay the artifact out as a Cargo package.
    pub fn cargo_project(mut self) -> Self {
        self.layout = ProjectLayout::Cargo;
        self.entry_file = "src/main.rs".to_string();
        self
    }

    /// Add a regex that marks output as a compile failure.
    pub fn compile_marker(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => self.compile_markers.push(re),
            Err(e) => warn!("Ignoring invalid compile marker {:?}: {}", pattern, e),
        }
        self
    }

    /// Whether this language has a separate build step.
    pub fn has_build_step(&self) -> bool {
        self.build.is_some()
    }

    /// The test command to run for `artifact`, if it carries tests.
    pub fn test_command(&self, artifact: &str) -> Option<&CommandTemplate> {
        self.tests
            .iter()
            .find(|t| t.applies_to(artifact))
            .map(|t| &t.command)
    }

    /// Check whether output contains any compile-failure marker.
    pub fn matches_compile_marker(&self, output: &str) -> bool {
        self.compile_markers.iter().any(|re| re.is_match(output))
    }

    /// Check whether a requested name refers to this language.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.aliases.iter().any(|a| *a == name)
    }
}

/// Registry of language profiles keyed by [`Language`].
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<Language, LanguageProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<ProfileRegistry> = OnceLock::new();

impl ProfileRegistry {
    /// Create a registry with the default table.
    pub fn new() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert(
            Language::Python,
            LanguageProfile::new(Language::Python, "Python", "py")
                .alias("py")
                .alias("python3")
                .build(&["python3", "-m", "py_compile", "{file}"])
                .run(&["python3", "{file}"])
                .test(&["python3", "-m", "pytest", "-q", "{file}"], r"\bpytest\b")
                .test(&["python3", "-m", "unittest", "-v", "{file}"], r"\bunittest\b")
                .timeout_secs(30)
                .env("PYTHONUNBUFFERED", "1")
                .compile_marker(r"(?m)^\s*(SyntaxError|IndentationError|TabError):"),
        );

        profiles.insert(
            Language::Rust,
            LanguageProfile::new(Language::Rust, "Rust", "rs")
                .alias("rs")
                .cargo_project()
                .build(&["cargo", "build", "--quiet"])
                .run(&["cargo", "run", "--quiet"])
                .test(&["cargo", "test", "--quiet"], r"#\[(\w+::)?test\]")
                .timeout_secs(120)
                .env("CARGO_TERM_COLOR", "never")
                .compile_marker(r"(?m)^error(\[E\d{4}\]|: could not compile)"),
        );

        profiles.insert(
            Language::JavaScript,
            LanguageProfile::new(Language::JavaScript, "JavaScript", "js")
                .alias("js")
                .alias("node")
                .alias("nodejs")
                .run(&["node", "{file}"])
                .timeout_secs(30)
                .compile_marker(r"(?m)^SyntaxError:"),
        );

        profiles.insert(
            Language::Go,
            LanguageProfile::new(Language::Go, "Go", "go")
                .alias("golang")
                .build(&["go", "build", "-o", "main", "{file}"])
                .run(&["./main"])
                .timeout_secs(60),
        );

        profiles.insert(
            Language::C,
            LanguageProfile::new(Language::C, "C", "c")
                .build(&["cc", "-O0", "-o", "main", "{file}"])
                .run(&["./main"])
                .timeout_secs(30),
        );

        profiles.insert(
            Language::Cpp,
            LanguageProfile::new(Language::Cpp, "C++", "cpp")
                .alias("c++")
                .alias("cxx")
                .build(&["c++", "-std=c++17", "-O0", "-o", "main", "{file}"])
                .run(&["./main"])
                .timeout_secs(30),
        );

        profiles.insert(
            Language::Shell,
            LanguageProfile::new(Language::Shell, "Shell", "sh")
                .alias("sh")
                .alias("bash")
                .build(&["sh", "-n", "{file}"])
                .run(&["sh", "{file}"])
                .timeout_secs(30)
                .compile_marker(r"syntax error"),
        );

        Self { profiles }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ProfileRegistry {
        GLOBAL_REGISTRY.get_or_init(ProfileRegistry::new)
    }

    /// Get the profile for a language.
    pub fn get(&self, language: Language) -> Option<&LanguageProfile> {
        self.profiles.get(&language)
    }

    /// Resolve a user-supplied language name or alias.
    pub fn resolve(&self, name: &str) -> RunnerResult<&LanguageProfile> {
        self.profiles()
            .find(|profile| profile.matches_name(name))
            .ok_or_else(|| RunnerError::UnsupportedLanguage(name.trim().to_string()))
    }

    /// All profiles in declaration order.
    pub fn profiles(&self) -> impl Iterator<Item = &LanguageProfile> {
        Language::all().iter().filter_map(|lang| self.profiles.get(lang))
    }
}

/// Resolve a language name against the process-wide registry.
pub fn resolve(name: &str) -> RunnerResult<&'static LanguageProfile> {
    ProfileRegistry::global().resolve(name)
}
