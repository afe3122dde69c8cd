//! Configuration loading and management
//!
//! Handles parsing of `friction.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration as StdDuration;

use crate::decay::{DecayPolicy, DEFAULT_HOT_TTL_DAYS};
use crate::error::{Error, Result};
use crate::friction::Friction;
use crate::model::ProjectStatus;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "friction.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project defaults
    #[serde(default)]
    pub projects: ProjectsConfig,

    /// Task defaults
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Decay rules
    #[serde(default)]
    pub decay: DecayConfig,

    /// Load gauge thresholds
    #[serde(default)]
    pub gauge: GaugeConfig,
}

/// Project-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Status for new projects
    #[serde(default)]
    pub default_status: ProjectStatus,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            default_status: ProjectStatus::Hot,
        }
    }
}

/// Task-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Friction for new tasks
    #[serde(default = "default_task_friction")]
    pub default_friction: Friction,
}

fn default_task_friction() -> Friction {
    Friction::Low
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_friction: default_task_friction(),
        }
    }
}

/// Decay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Days of inactivity before a hot project turns cold
    #[serde(default = "default_hot_ttl_days")]
    pub hot_ttl_days: u32,

    /// Seconds between sweeps in `friction watch`
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_hot_ttl_days() -> u32 {
    DEFAULT_HOT_TTL_DAYS as u32
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            hot_ttl_days: default_hot_ttl_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl DecayConfig {
    pub fn policy(&self) -> DecayPolicy {
        DecayPolicy {
            hot_ttl: chrono::Duration::days(i64::from(self.hot_ttl_days)),
        }
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs)
    }
}

/// Load gauge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaugeConfig {
    /// Score at which the gauge reads 100%
    #[serde(default = "default_gauge_max")]
    pub max: u32,

    /// Scores above this are "warm"
    #[serde(default = "default_warm_above")]
    pub warm_above: u32,

    /// Scores above this are "strained"
    #[serde(default = "default_strained_above")]
    pub strained_above: u32,
}

fn default_gauge_max() -> u32 {
    20
}

fn default_warm_above() -> u32 {
    5
}

fn default_strained_above() -> u32 {
    12
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            max: default_gauge_max(),
            warm_above: default_warm_above(),
            strained_above: default_strained_above(),
        }
    }
}

impl Config {
    /// Load configuration from a `friction.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a data directory, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.decay.validate()?;
        self.gauge.validate()?;
        Ok(())
    }
}

impl DecayConfig {
    fn validate(&self) -> Result<()> {
        if self.hot_ttl_days == 0 {
            return Err(Error::InvalidConfig(
                "decay.hot_ttl_days must be > 0".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "decay.sweep_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl GaugeConfig {
    fn validate(&self) -> Result<()> {
        if self.max == 0 {
            return Err(Error::InvalidConfig("gauge.max must be > 0".to_string()));
        }
        if self.warm_above >= self.strained_above {
            return Err(Error::InvalidConfig(format!(
                "gauge.warm_above ({}) must be below gauge.strained_above ({})",
                self.warm_above, self.strained_above
            )));
        }
        Ok(())
    }
}
