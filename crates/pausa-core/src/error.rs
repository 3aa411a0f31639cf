//! Core error types for pausa-core.
//!
//! Each concern carries its own thiserror enum. Timer state-machine
//! violations are the only errors surfaced to callers as hard failures;
//! persistence and plugin failures are logged and degrade gracefully.

use std::path::PathBuf;
use thiserror::Error;

/// Timer state-machine violations, returned synchronously to the caller.
#[derive(Error, Debug)]
pub enum TimerError {
    /// Start was called while a session is running
    #[error("timer already running")]
    AlreadyRunning,

    /// Pause or stop was called without a session in progress
    #[error("timer not running")]
    NotRunning,

    /// Resume was called outside the paused state
    #[error("timer not paused")]
    NotPaused,

    /// Start was called with a zero-length duration
    #[error("invalid duration")]
    InvalidDuration,

    /// Reset was called before the session completed
    #[error("timer not completed")]
    NotCompleted,
}

/// State/history persistence failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading a store file failed
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a store file failed
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store file exists but cannot be parsed
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The data directory cannot be determined or created
    #[error("data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Plugin loading and lifecycle errors.
#[derive(Error, Debug)]
pub enum PluginError {
    /// A plugin with the same declared name is already loaded
    #[error("plugin '{name}' is already loaded")]
    Duplicate { name: String },

    /// The script ran but never called register_plugin with a name
    #[error("plugin script '{name}' did not register a descriptor")]
    MissingDescriptor { name: String },

    /// The script failed to execute
    #[error("plugin '{name}' failed: {source}")]
    Script {
        name: String,
        #[source]
        source: mlua::Error,
    },

    /// No loaded plugin has this name
    #[error("plugin '{name}' is not loaded")]
    NotFound { name: String },

    /// Reading a script file or scanning the plugin directory failed
    #[error("failed to read plugin path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
