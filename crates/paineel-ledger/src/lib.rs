//! PAINEEL Ledger - the spreadsheet that holds one row per tracked process.
//!
//! [`LedgerStore`] is the narrow interface the monitor depends on.
//! [`SheetsLedger`] talks to Google Sheets; [`MemoryLedger`] keeps the rows
//! in process for tests and dry runs.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod memory;
pub mod sheets;
pub mod store;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sheets::{ServiceAccountKey, SheetsLedger};
pub use store::{column_letter, LedgerStore};
