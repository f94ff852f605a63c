//! Configuration management for Floodgate.

use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{FloodgateError, Result};
use crate::ratelimit::LimitConfig;

/// Environment variable prefix for layered settings.
pub const ENV_PREFIX: &str = "FLOODGATE";

/// Main configuration for Floodgate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Background sweep configuration
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Per-action limits
    #[serde(default)]
    pub policies: PolicyConfigs,
}

/// Background sweep configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweeps of stale entries
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
        }
    }
}

impl SweepConfig {
    /// The sweep interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_sweep_interval() -> u64 {
    300
}

/// Limits for each guarded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfigs {
    #[serde(default = "default_login")]
    pub login: PolicySettings,

    #[serde(default = "default_registration")]
    pub registration: PolicySettings,

    #[serde(default = "default_contact_form")]
    pub contact_form: PolicySettings,

    #[serde(default = "default_api")]
    pub api: PolicySettings,
}

impl Default for PolicyConfigs {
    fn default() -> Self {
        Self {
            login: default_login(),
            registration: default_registration(),
            contact_form: default_contact_form(),
            api: default_api(),
        }
    }
}

/// Limits for a single guarded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_secs: u64,
    /// Lockout length in seconds
    pub block_secs: u64,
}

impl PolicySettings {
    /// Convert into limiter configuration, rejecting zero values.
    pub fn limit_config(&self) -> Result<LimitConfig> {
        LimitConfig::new(
            self.max_attempts,
            Duration::from_secs(self.window_secs),
            Duration::from_secs(self.block_secs),
        )
    }
}

fn default_login() -> PolicySettings {
    PolicySettings {
        max_attempts: 5,
        window_secs: 15 * 60,
        block_secs: 30 * 60,
    }
}

fn default_registration() -> PolicySettings {
    PolicySettings {
        max_attempts: 3,
        window_secs: 10 * 60,
        block_secs: 60 * 60,
    }
}

fn default_contact_form() -> PolicySettings {
    PolicySettings {
        max_attempts: 5,
        window_secs: 10 * 60,
        block_secs: 20 * 60,
    }
}

fn default_api() -> PolicySettings {
    PolicySettings {
        max_attempts: 30,
        window_secs: 60,
        block_secs: 5 * 60,
    }
}

impl FloodgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    ///
    /// Missing policies and missing fields within a policy keep their
    /// built-in values.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(format!("Failed to parse configuration: {}", e)))?;

        let mut builder = Self::defaults_builder()?;
        if !document.is_null() {
            builder = builder.add_source(config::Config::try_from(&document)?);
        }

        Self::build(builder)
    }

    /// Load layered configuration.
    ///
    /// Values start from the built-in defaults, then come from the optional
    /// file, then from `FLOODGATE__*` environment variables (e.g.
    /// `FLOODGATE__POLICIES__LOGIN__MAX_ATTEMPTS`). Each layer may set
    /// individual fields.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::defaults_builder()?;

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Self::build(builder)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FloodgateError::Config(format!("Failed to render configuration: {}", e)))
    }

    fn defaults_builder() -> Result<ConfigBuilder<DefaultState>> {
        let defaults = config::Config::try_from(&FloodgateConfig::default())?;
        Ok(config::Config::builder().add_source(defaults))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: FloodgateConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every limit and the sweep interval are positive.
    pub fn validate(&self) -> Result<()> {
        if self.sweep.interval_secs == 0 {
            return Err(FloodgateError::Config(
                "sweep.interval_secs must be greater than zero".to_string(),
            ));
        }

        let policies = [
            ("login", &self.policies.login),
            ("registration", &self.policies.registration),
            ("contact_form", &self.policies.contact_form),
            ("api", &self.policies.api),
        ];
        for (name, settings) in policies {
            settings.limit_config().map_err(|e| match e {
                FloodgateError::Config(msg) => {
                    FloodgateError::Config(format!("policies.{}: {}", name, msg))
                }
                other => other,
            })?;
        }

        Ok(())
    }
}
