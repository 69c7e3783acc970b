//! Core error types for PAINEEL.
//!
//! `PaineelError` is the shared error for domain validation and retry
//! exhaustion; configuration problems get their own `ConfigError` so the
//! binary can tell a fatal setup failure apart from a per-record hiccup.

use thiserror::Error;

/// Central error type for shared PAINEEL operations.
#[derive(Error, Debug)]
pub enum PaineelError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed process number or other invalid input
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was cancelled by the user
    #[error("run cancelled by user")]
    Cancelled,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required settings are absent
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
}

/// Result type alias using `PaineelError`.
pub type Result<T> = std::result::Result<T, PaineelError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
