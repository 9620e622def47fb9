//! Per-attempt working directories.
//!
//! Every attempt gets a fresh, uniquely named directory under the work root.
//! The directory is owned by a [`Workdir`] guard and removed when the guard
//! is dropped, so it disappears on success, failure, timeout, cancellation
//! and panics alike.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::profiles::{LanguageProfile, ProjectLayout};

static CARGO_DEPENDENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*//\s*([A-Za-z0-9_-]+\s*=\s*(?:"[^"]*"|\{.*\}))\s*$"#)
        .expect("dependency regex is valid")
});

static CARGO_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*//\s*\[[A-Za-z0-9_.-]+\]\s*$").expect("section regex is valid")
});

/// Scoped working directory for one attempt.
#[derive(Debug)]
pub struct Workdir {
    dir: TempDir,
}

impl Workdir {
    /// Create a new uniquely named directory under `root`.
    pub fn create(root: &Path) -> RunnerResult<Self> {
        fs::create_dir_all(root).map_err(|e| {
            RunnerError::SandboxSetup(format!(
                "cannot create work root {}: {}",
                root.display(),
                e
            ))
        })?;

        let dir = tempfile::Builder::new()
            .prefix("attempt-")
            .tempdir_in(root)
            .map_err(|e| {
                RunnerError::SandboxSetup(format!(
                    "cannot create working directory in {}: {}",
                    root.display(),
                    e
                ))
            })?;

        debug!("Created working directory {:?}", dir.path());
        Ok(Self { dir })
    }

    /// Path of the working directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the artifact according to the profile's layout.
    ///
    /// Returns the path of the entry file.
    pub fn materialize(&self, profile: &LanguageProfile, artifact: &str) -> RunnerResult<PathBuf> {
        let entry = self.path().join(&profile.entry_file);

        let source = match profile.layout {
            ProjectLayout::SingleFile => artifact.to_string(),
            ProjectLayout::Cargo => {
                let (dependencies, code) = split_cargo_dependencies(artifact);
                write_file(&self.path().join("Cargo.toml"), &cargo_manifest(&dependencies))?;
                code
            }
        };

        write_file(&entry, &source)?;
        Ok(entry)
    }

    /// Remove the directory now, logging instead of failing on error.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove working directory {:?}: {}", path, e);
        }
    }
}

fn write_file(path: &Path, content: &str) -> RunnerResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RunnerError::SandboxSetup(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, content).map_err(|e| {
        RunnerError::SandboxSetup(format!("cannot write {}: {}", path.display(), e))
    })
}

/// Lift `// name = "version"` and `// name = { ... }` comment lines out of
/// Rust source.
///
/// Returns the dependency lines and the source with those comments (and any
/// `// [section]` headers) removed.
pub fn split_cargo_dependencies(code: &str) -> (Vec<String>, String) {
    let mut dependencies = Vec::new();
    let mut kept = Vec::new();

    for line in code.lines() {
        if let Some(caps) = CARGO_DEPENDENCY_RE.captures(line) {
            dependencies.push(caps[1].trim().to_string());
        } else if !CARGO_SECTION_RE.is_match(line) {
            kept.push(line);
        }
    }

    let mut source = kept.join("\n");
    source.push('\n');
    (dependencies, source)
}

/// Manifest for a generated single-binary package.
pub fn cargo_manifest(dependencies: &[String]) -> String {
    let mut manifest = String::from(
        "[package]\nname = \"attempt\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[workspace]\n\n[dependencies]\n",
    );
    for dep in dependencies {
        manifest.push_str(dep);
        manifest.push('\n');
    }
    manifest
}
