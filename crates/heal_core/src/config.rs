//! Healing configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use heal_runner::default_work_root;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::DEFAULT_SUMMARY_LIMIT;
use crate::error::{CoreError, CoreResult};

/// Default attempt budget per task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What failure context the generator sees on a retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackPolicy {
    /// Only the previous attempt's summary.
    #[default]
    Latest,
    /// Every earlier summary, labelled by attempt.
    Cumulative,
}

impl std::str::FromStr for FeedbackPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "cumulative" => Ok(Self::Cumulative),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown feedback policy '{}' (expected latest or cumulative)",
                other
            ))),
        }
    }
}

/// Settings for a healing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingConfig {
    /// Attempt budget per task
    pub max_attempts: u32,
    /// Per-step timeout override in seconds; the profile default applies when unset
    pub step_timeout_secs: Option<f64>,
    /// Directory under which per-attempt working directories are created
    pub work_root: PathBuf,
    /// Maximum error summary length in characters
    pub summary_limit: usize,
    /// Feedback given to the generator on retries
    pub feedback: FeedbackPolicy,
    /// Where attempt ledgers are persisted, if anywhere
    pub ledger_dir: Option<PathBuf>,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            step_timeout_secs: None,
            work_root: default_work_root(),
            summary_limit: DEFAULT_SUMMARY_LIMIT,
            feedback: FeedbackPolicy::default(),
            ledger_dir: None,
        }
    }
}

impl HealingConfig {
    /// Load a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            CoreError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        debug!("Loaded healing config from {:?}", path);
        Ok(config)
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_secs = Some(timeout.as_secs_f64());
        self
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    pub fn with_summary_limit(mut self, limit: usize) -> Self {
        self.summary_limit = limit;
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackPolicy) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_ledger_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ledger_dir = Some(dir.into());
        self
    }

    /// The per-step timeout override, if one is set.
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Reject settings the orchestrator cannot honor.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_attempts == 0 {
            return Err(CoreError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.summary_limit == 0 {
            return Err(CoreError::InvalidConfig(
                "summary_limit must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = self.step_timeout_secs {
            if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                return Err(CoreError::InvalidConfig(format!(
                    "step_timeout_secs must be a positive, representable number of seconds, got {}",
                    secs
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HealingConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.summary_limit, 2000);
        assert_eq!(config.feedback, FeedbackPolicy::Latest);
        assert!(config.step_timeout().is_none());
        assert!(config.ledger_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = HealingConfig::default().with_max_attempts(0);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = HealingConfig::default().with_summary_limit(0);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let mut config = HealingConfig::default();
        for secs in [-1.0, 0.0, f64::NAN, f64::INFINITY, 1e300] {
            config.step_timeout_secs = Some(secs);
            assert!(
                matches!(config.validate(), Err(CoreError::InvalidConfig(_))),
                "{} should be rejected",
                secs
            );
        }

        config.step_timeout_secs = Some(0.25);
        assert!(config.validate().is_ok());
        assert_eq!(config.step_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_step_timeout_override() {
        let config = HealingConfig::default().with_step_timeout(Duration::from_millis(1500));
        assert_eq!(config.step_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heal.toml");
        fs::write(
            &path,
            "max_attempts = 5\nfeedback = \"cumulative\"\nstep_timeout_secs = 10\n",
        )
        .unwrap();

        let config = HealingConfig::from_file(&path).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.feedback, FeedbackPolicy::Cumulative);
        assert_eq!(config.step_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.summary_limit, DEFAULT_SUMMARY_LIMIT);
    }

    #[test]
    fn test_from_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heal.toml");
        fs::write(&path, "max_attempts = 0\n").unwrap();
        assert!(matches!(
            HealingConfig::from_file(&path),
            Err(CoreError::InvalidConfig(_))
        ));

        fs::write(&path, "max_attempts = \"many\"\n").unwrap();
        assert!(matches!(
            HealingConfig::from_file(&path),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_feedback_policy_from_str() {
        assert_eq!("Latest".parse::<FeedbackPolicy>().unwrap(), FeedbackPolicy::Latest);
        assert_eq!(
            "cumulative".parse::<FeedbackPolicy>().unwrap(),
            FeedbackPolicy::Cumulative
        );
        assert!("all".parse::<FeedbackPolicy>().is_err());
    }
}
