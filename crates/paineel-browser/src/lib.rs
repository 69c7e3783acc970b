//! Browser automation for the SEI public search pages.
//!
//! Provides the [`BrowserActions`] interface the monitor drives and a
//! Chromium implementation with an anti-automation fingerprint.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{BrowserActions, ElementSummary, Locator, TabHandle};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
