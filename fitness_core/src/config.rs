//! Configuration file support for FitnessX.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitx/config.toml`.

use crate::stream::{PathEnd, DEFAULT_BASE_INTERVAL, MAX_SPEED, MIN_SPEED};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Position stream configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,

    #[serde(default = "default_speed")]
    pub speed: f64,

    #[serde(default)]
    pub path_end: PathEnd,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            speed: default_speed(),
            path_end: PathEnd::default(),
        }
    }
}

impl StreamConfig {
    pub fn base_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.base_interval_ms)
    }
}

/// Session clock configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

impl TimerConfig {
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_seconds)
    }
}

// Default value functions
fn default_base_interval_ms() -> u64 {
    DEFAULT_BASE_INTERVAL.as_millis() as u64
}

fn default_speed() -> f64 {
    1.0
}

fn default_tick_seconds() -> u64 {
    1
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| Error::Config("cannot determine config directory".into()))?;
        Ok(base.join("fitx").join("config.toml"))
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the controllers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stream.base_interval_ms == 0 {
            return Err(Error::Config("stream.base_interval_ms must be > 0".into()));
        }
        if !self.stream.speed.is_finite() {
            return Err(Error::Config("stream.speed must be a number".into()));
        }
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.stream.speed) {
            tracing::warn!(
                "stream.speed {} outside [{}, {}], it will be clamped",
                self.stream.speed,
                MIN_SPEED,
                MAX_SPEED
            );
        }
        if self.timer.tick_seconds == 0 {
            return Err(Error::Config("timer.tick_seconds must be > 0".into()));
        }
        Ok(())
    }
}
