//! PAINEEL Mail - the monitoring report and its SMTP delivery.
//!
//! [`report::render`] turns a [`paineel_monitor::Notification`] into an HTML
//! document; [`SmtpNotifier`] sends it to the configured recipients.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod notifier;
pub mod report;
pub mod sender;

pub use error::{MailError, Result};
pub use notifier::SmtpNotifier;
pub use report::{organize_columns, render};
pub use sender::SmtpMailer;
