//! TOML-based application configuration.
//!
//! Stores user preferences:
//! - default session durations
//! - plugin directory, plugin master switch, per-plugin disable list
//! - event queue capacity
//! - log level
//!
//! Configuration is stored at `~/.config/pausa/config.toml` and created
//! with defaults on first load.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StoreError};

use super::data_dir;

const CONFIG_FILE: &str = "config.toml";

/// Default session durations, in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u64,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u64,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u64,
}

/// Plugin loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory scanned for `*.lua` scripts. Defaults to
    /// `<data_dir>/plugins` when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Plugins loaded but left disabled for dispatch.
    #[serde(default)]
    pub disabled: Vec<String>,
}

/// Event bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pausa/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_work_minutes() -> u64 {
    25
}
fn default_short_break_minutes() -> u64 {
    5
}
fn default_long_break_minutes() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_queue_capacity() -> usize {
    crate::plugins::DEFAULT_QUEUE_CAPACITY
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            disabled: Vec::new(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            plugins: PluginsConfig::default(),
            events: EventsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Path of the configuration file under the data directory.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from(CONFIG_FILE),
            message: e.to_string(),
        })?;
        Ok(dir.join(CONFIG_FILE))
    }

    /// Load from the default location, writing a default file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            return Ok(config);
        }
        Self::load_from(&path)
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer.work_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.work_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.timer.short_break_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.short_break_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.timer.long_break_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timer.long_break_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.events.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "events.queue_capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!("unknown level '{}'", self.logging.level),
            });
        }
        Ok(())
    }

    /// Directory scanned for plugin scripts.
    pub fn plugins_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.plugins.directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("plugins")),
        }
    }

    pub fn work_duration(&self) -> Duration {
        Duration::from_secs(self.timer.work_minutes * 60)
    }

    pub fn short_break_duration(&self) -> Duration {
        Duration::from_secs(self.timer.short_break_minutes * 60)
    }

    pub fn long_break_duration(&self) -> Duration {
        Duration::from_secs(self.timer.long_break_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.timer.work_minutes, 25);
        assert_eq!(config.work_duration(), Duration::from_secs(25 * 60));
        assert_eq!(config.events.queue_capacity, 64);
        assert!(config.plugins.enabled);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("[timer]\nwork_minutes = 50\n").unwrap();
        assert_eq!(config.timer.work_minutes, 50);
        assert_eq!(config.timer.short_break_minutes, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_duration_is_rejected() {
        let config: Config = toml::from_str("[timer]\nwork_minutes = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let config: Config = toml::from_str("[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.timer.work_minutes = 45;
        config.plugins.disabled = vec!["noisy".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timer.work_minutes, 45);
        assert_eq!(loaded.plugins.disabled, vec!["noisy".to_string()]);
    }
}
