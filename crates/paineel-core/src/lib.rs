//! PAINEEL Core - Foundation crate for the PAINEEL process monitor.
//!
//! This crate provides shared types, error handling, configuration management,
//! retry and run control that all other PAINEEL crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Process numbers, extracted records and ledger rows
//! - [`retry`] - Bounded retry with exponential backoff
//! - [`control`] - Cooperative cancellation, pause and step mode
//!
//! # Example
//!
//! ```rust
//! use paineel_core::{AppConfig, ProcessNumber};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.execution.max_retry_rounds, 3);
//!
//! let number = ProcessNumber::parse("48500.000123/2024-01")?;
//! assert_eq!(number.as_str(), "48500000123202401");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod control;
pub mod error;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CaptchaConfig, EmailConfig, ExecutionConfig, LedgerConfig,
    LoggingConfig, OcrConfig, PathsConfig, SmtpConfig, TargetConfig,
};
pub use control::RunControl;
pub use error::{ConfigError, ConfigResult, PaineelError, Result};
pub use retry::{retry_with_backoff, retry_with_backoff_if, RetryPolicy};
pub use types::{
    canonicalize, DocumentEntry, LedgerRow, ProcessNumber, ProcessRecord, ProgressEntry,
};
