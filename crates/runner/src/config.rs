//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flowspec_common::{Error, Result};

use crate::poll::PollPolicy;

/// What happens when an engine or read-model call fails during a test case.
///
/// This covers the `before_each` and `after_each` hooks and resource
/// deployment as well as the steps. A resource that cannot be resolved always
/// aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterFailurePolicy {
    /// Propagate the error and abort the whole spec run
    #[default]
    AbortRun,
    /// Record the error as the failure of the current test case and go on
    FailTestCase,
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Budget for a single verification or await action
    pub verification_timeout_ms: u64,

    /// Pause between two checks
    pub retry_interval_ms: u64,

    /// Directory process resources are resolved against
    pub resource_dir: PathBuf,

    pub adapter_failure: AdapterFailurePolicy,

    /// Where result reports are written
    pub report_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            verification_timeout_ms: 10_000,
            retry_interval_ms: 10,
            resource_dir: PathBuf::from("."),
            adapter_failure: AdapterFailurePolicy::default(),
            report_dir: PathBuf::from("test-results"),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "retry_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.verification_timeout(), self.retry_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = RunnerConfig::load(&tmp.path().join("flowspec.toml")).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.verification_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flowspec.toml");
        std::fs::write(
            &path,
            "verification_timeout_ms = 500\nadapter_failure = \"fail-test-case\"\n",
        )
        .unwrap();

        let config = RunnerConfig::load(&path).unwrap();
        assert_eq!(config.verification_timeout_ms, 500);
        assert_eq!(config.adapter_failure, AdapterFailurePolicy::FailTestCase);
        assert_eq!(config.retry_interval_ms, 10);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("conf").join("flowspec.toml");
        let config = RunnerConfig {
            retry_interval_ms: 250,
            resource_dir: PathBuf::from("processes"),
            ..Default::default()
        };

        config.save(&path).unwrap();
        assert_eq!(RunnerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_zero_retry_interval_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("flowspec.toml");
        std::fs::write(&path, "retry_interval_ms = 0\n").unwrap();

        assert!(matches!(
            RunnerConfig::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }
}
