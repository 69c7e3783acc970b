//! PAINEEL Monitor - keeps the process ledger in sync with the SEI search.
//!
//! A run validates the process numbers, extracts each one through the
//! browser, writes it to the ledger and finally diffs the ledger against the
//! previous run to decide what to notify.
//!
//! # Example
//!
//! ```rust,ignore
//! use paineel_monitor::{Orchestrator, ProcessExtractor, RecordReconciler};
//!
//! let orchestrator = Orchestrator::new(browser, extractor, reconciler, control, config.execution);
//! let report = orchestrator.run(None).await?;
//! println!("{}", report.stats);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod detector;
pub mod error;
pub mod extractor;
pub mod notifier;
pub mod orchestrator;
pub mod parser;
pub mod reconciler;
pub mod snapshot;
pub mod stats;

pub use detector::{diff, ChangeDetector, DetectionReport};
pub use error::{ExtractStage, MonitorError, Result};
pub use extractor::{ExtractorSettings, ProcessExtractor};
pub use notifier::{ChangeEvent, ChangeKind, Notification, Notifier};
pub use orchestrator::{
    Orchestrator, OutcomeStatus, ProcessOutcome, RunBudget, RunReport,
};
pub use parser::parse_record;
pub use reconciler::{ReconcileStatus, RecordReconciler};
pub use snapshot::{Fingerprint, Snapshot, SnapshotStore};
pub use stats::RunStats;
