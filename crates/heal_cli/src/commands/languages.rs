//! Languages command - List supported languages.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use heal_runner::{LanguageProfile, ProfileRegistry};
use serde::Serialize;

#[derive(Args)]
pub struct LanguagesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LanguageInfo {
    language: String,
    name: String,
    aliases: Vec<String>,
    build: Option<String>,
    run: String,
    tests: Vec<String>,
    timeout_secs: u64,
    available: bool,
}

impl From<&LanguageProfile> for LanguageInfo {
    fn from(profile: &LanguageProfile) -> Self {
        Self {
            language: profile.language.to_string(),
            name: profile.display_name.clone(),
            aliases: profile.aliases.clone(),
            build: profile.build.as_ref().map(|b| b.to_string()),
            run: profile.run.to_string(),
            tests: profile.tests.iter().map(|t| t.command.to_string()).collect(),
            timeout_secs: profile.timeout.as_secs(),
            available: toolchain_available(profile),
        }
    }
}

pub fn execute(args: LanguagesArgs) -> Result<()> {
    let infos: Vec<LanguageInfo> = ProfileRegistry::global()
        .profiles()
        .map(LanguageInfo::from)
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<24} {:<9} {}",
        "LANGUAGE", "ALIASES", "TOOLCHAIN", "RUN"
    );
    for info in &infos {
        println!(
            "{:<12} {:<24} {:<9} {}",
            info.name,
            info.aliases.join(", "),
            if info.available { "found" } else { "missing" },
            info.run
        );
    }

    Ok(())
}

/// Whether the programs a profile needs can be found.
///
/// Run commands that point into the working directory (like `./main`) are
/// produced by the build step and do not need to exist up front.
pub(crate) fn toolchain_available(profile: &LanguageProfile) -> bool {
    let build_ok = profile
        .build
        .as_ref()
        .map_or(true, |b| find_on_path(b.program()).is_some());
    let run = profile.run.program();
    let run_ok = run.starts_with("./") || find_on_path(run).is_some();
    build_ok && run_ok
}

pub(crate) fn find_on_path(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use heal_runner::{resolve, Language};

    #[cfg(unix)]
    #[test]
    fn test_shell_is_available() {
        assert!(find_on_path("sh").is_some());
        assert!(toolchain_available(resolve("sh").unwrap()));
    }

    #[test]
    fn test_missing_program() {
        assert!(find_on_path("selfheal-no-such-tool-3e9a").is_none());
        assert!(find_on_path("").is_none());

        let profile = LanguageProfile::new(Language::Shell, "Missing", "sh")
            .run(&["selfheal-no-such-tool-3e9a", "{file}"]);
        assert!(!toolchain_available(&profile));
    }

    #[test]
    fn test_language_info() {
        let info = LanguageInfo::from(resolve("python").unwrap());
        assert_eq!(info.language, "python");
        assert_eq!(info.build.as_deref(), Some("python3 -m py_compile {file}"));
        assert!(info.aliases.contains(&"py".to_string()));
        assert_eq!(info.timeout_secs, 30);
        assert_eq!(info.tests.len(), 2);

        let rust = LanguageInfo::from(resolve("rust").unwrap());
        assert_eq!(rust.tests, vec!["cargo test --quiet".to_string()]);
    }
}
