//! Core error types for pomobar-core.
//!
//! None of these are fatal to an in-progress countdown: the engine keeps
//! timing from the clock even when the persisted total cannot be read or
//! written.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomobar-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A session was requested with a zero-length duration.
    #[error("Invalid duration: {0} (a session must last longer than zero)")]
    InvalidDuration(u64),

    /// The persistence store could not be read or written.
    #[error("Persistence unavailable: {0}")]
    Persistence(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be parsed.
    #[error("corrupt value for '{key}': {value:?}")]
    Corrupt { key: String, value: String },

    /// SQLite failure
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
