//! Verification timing configuration.
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (LDS_* prefix, highest precedence)
//! 2. lodestone.toml in the project directory
//! 3. Built-in defaults (lowest precedence)
//!
//! Three operation classes carry their own interval/timeout budget:
//! direct object reads converge fast, derived-object propagation takes
//! longer, and cluster-wide effects (downstream fan-out) can take tens
//! of minutes.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::poll::PollConfig;

/// One operation class's polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollProfile {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub immediate: bool,
}

impl Default for PollProfile {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            timeout_ms: 60_000,
            immediate: true,
        }
    }
}

impl PollProfile {
    pub fn new(interval_ms: u64, timeout_ms: u64, immediate: bool) -> Self {
        Self {
            interval_ms,
            timeout_ms,
            immediate,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.interval_ms),
            Duration::from_millis(self.timeout_ms),
            self.immediate,
        )
    }
}

/// Main verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Direct object reads (generated roles, feature flags).
    pub object: PollProfile,
    /// Derived-object propagation (binding fan-out, template deletion).
    pub propagation: PollProfile,
    /// Cluster-wide effects across downstream clusters.
    pub cluster_wide: PollProfile,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            object: PollProfile::new(500, 60_000, true),
            propagation: PollProfile::new(2_000, 300_000, false),
            cluster_wide: PollProfile::new(10_000, 1_800_000, false),
        }
    }
}

impl VerifyConfig {
    /// Millisecond-scale budgets for driving fakes in tests.
    pub fn fast_for_tests() -> Self {
        Self {
            object: PollProfile::new(1, 50, true),
            propagation: PollProfile::new(1, 50, true),
            cluster_wide: PollProfile::new(1, 50, true),
        }
    }

    /// Rejects budgets the poller cannot honor.
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in [
            ("object", &self.object),
            ("propagation", &self.propagation),
            ("cluster_wide", &self.cluster_wide),
        ] {
            if profile.interval_ms == 0 {
                bail!("{name}: interval_ms must be non-zero");
            }
            if profile.timeout_ms < profile.interval_ms {
                bail!(
                    "{name}: timeout_ms ({}) must be at least interval_ms ({})",
                    profile.timeout_ms,
                    profile.interval_ms
                );
            }
        }
        Ok(())
    }
}

/// Configuration loader with builder pattern.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir).
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "LDS".to_string(),
        }
    }

    /// Set the project directory.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "LDS").
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence.
    pub fn load(self) -> Result<VerifyConfig> {
        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        let defaults = VerifyConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Project config (lodestone.toml)
        let config_file = self.project_dir.join("lodestone.toml");
        if config_file.exists() {
            builder = builder.add_source(
                config::File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Environment variables (LDS_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let merged = builder.build().context("Failed to build configuration")?;
        let verify_config: VerifyConfig = merged
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        verify_config.validate()?;
        Ok(verify_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = VerifyConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.object.immediate);
        assert!(!config.propagation.immediate);
        assert!(config.propagation.timeout_ms > config.object.timeout_ms);
        assert!(config.cluster_wide.timeout_ms > config.propagation.timeout_ms);
    }

    #[test_case(0, 1_000; "zero interval")]
    #[test_case(500, 499; "timeout below interval")]
    #[test_case(0, 0; "both zero")]
    fn test_validate_rejects(interval_ms: u64, timeout_ms: u64) {
        let mut config = VerifyConfig::default();
        config.propagation = PollProfile::new(interval_ms, timeout_ms, false);
        assert!(config.validate().is_err());
    }

    #[test_case(1, 1; "interval equals timeout")]
    #[test_case(500, 60_000; "object defaults")]
    fn test_validate_accepts(interval_ms: u64, timeout_ms: u64) {
        let mut config = VerifyConfig::default();
        config.propagation = PollProfile::new(interval_ms, timeout_ms, false);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lodestone.toml"),
            "[propagation]\ninterval_ms = 250\ntimeout_ms = 9000\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_project_dir(dir.path())
            .with_env_prefix("LDS_TEST_NONE")
            .load()
            .unwrap();

        assert_eq!(config.propagation.interval_ms, 250);
        assert_eq!(config.propagation.timeout_ms, 9000);
        // Untouched sections keep their defaults.
        assert_eq!(config.object.interval_ms, 500);
    }

    #[test]
    fn test_poll_config_conversion() {
        let profile = PollProfile::new(250, 9000, false);
        let poll = profile.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(250));
        assert_eq!(poll.timeout, Duration::from_millis(9000));
        assert!(!poll.immediate);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = VerifyConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: VerifyConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.object, config.object);
        assert_eq!(parsed.propagation, config.propagation);
        assert_eq!(parsed.cluster_wide, config.cluster_wide);
    }
}
