//! Find-or-insert of extracted records into the ledger.

use crate::error::{MonitorError, Result};
use paineel_core::{
    canonicalize, retry_with_backoff_if, LedgerRow, ProcessNumber, ProcessRecord, RetryPolicy,
};
use paineel_ledger::{LedgerError, LedgerStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Column holding the process number.
const KEY_COLUMN: usize = 1;

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    Inserted,
    Updated,
}

/// Sole writer of ledger rows.
///
/// Every store call goes through the retry policy. Only errors that
/// [`LedgerError::is_transient`] accepts are retried; a permanent error or an
/// exhausted policy surfaces as [`MonitorError::TransientIo`]. The lookup
/// that decides between insert and update always reads the current ledger,
/// so one process number must never be reconciled from two tasks at once.
pub struct RecordReconciler {
    store: Arc<dyn LedgerStore>,
    policy: RetryPolicy,
}

impl RecordReconciler {
    pub fn new(store: Arc<dyn LedgerStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, task_fn: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, LedgerError>>,
    {
        retry_with_backoff_if(&self.policy, operation, LedgerError::is_transient, task_fn)
            .await
            .map_err(|e| MonitorError::transient(operation, e))
    }

    /// 1-based row of `number`, skipping the header.
    pub async fn find_row(&self, number: &ProcessNumber) -> Result<Option<usize>> {
        let store = &self.store;
        let keys = self
            .with_retry("ledger lookup", move |_| store.column_values(KEY_COLUMN))
            .await?;

        Ok(keys
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, key)| number.matches(key))
            .map(|(idx, _)| idx + 1))
    }

    /// Write `record` to its row, appending one when the number is new.
    pub async fn reconcile(&self, record: &ProcessRecord) -> Result<ReconcileStatus> {
        let number = ProcessNumber::parse(&record.identifier)?;
        let cells = LedgerRow::from_record(record).to_cells();
        let cells = &cells;
        let store = &self.store;

        if let Some(row) = self.find_row(&number).await? {
            self.with_retry("ledger update", move |_| store.update_row(row, cells))
                .await?;
            debug!(process = %number, row, "row updated");
            Ok(ReconcileStatus::Updated)
        } else {
            self.with_retry("ledger append", move |_| store.append_row(cells))
                .await?;
            info!(process = %number, "row inserted");
            Ok(ReconcileStatus::Inserted)
        }
    }

    /// Whole ledger, header first.
    pub async fn read_all(&self) -> Result<Vec<Vec<String>>> {
        let store = &self.store;
        self.with_retry("ledger read", move |_| store.all_values())
            .await
    }

    /// Raw process numbers in column A, header and blank cells excluded.
    pub async fn list_identifiers(&self) -> Result<Vec<String>> {
        let store = &self.store;
        let keys = self
            .with_retry("ledger lookup", move |_| store.column_values(KEY_COLUMN))
            .await?;

        Ok(keys
            .into_iter()
            .skip(1)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect())
    }

    /// Append a row with only the key set. `false` when already tracked.
    pub async fn add(&self, raw: &str) -> Result<bool> {
        let number = ProcessNumber::parse(raw)?;
        if self.find_row(&number).await?.is_some() {
            return Ok(false);
        }
        let cells = vec![raw.trim().to_string()];
        let cells = &cells;
        let store = &self.store;
        self.with_retry("ledger append", move |_| store.append_row(cells))
            .await?;
        info!(process = %number, "added to ledger");
        Ok(true)
    }

    /// Delete the first row matching `raw`. `false` when not found.
    pub async fn remove(&self, raw: &str) -> Result<bool> {
        let number = ProcessNumber::parse(raw)?;
        let Some(row) = self.find_row(&number).await? else {
            return Ok(false);
        };
        let store = &self.store;
        self.with_retry("ledger delete", move |_| store.delete_row(row))
            .await?;
        info!(process = %number, row, "removed from ledger");
        Ok(true)
    }

    /// Overwrite the key cell of `old` with `new`. `false` when `old` is not found.
    pub async fn rename(&self, old: &str, new: &str) -> Result<bool> {
        let old_number = ProcessNumber::parse(old)?;
        let new_number = ProcessNumber::parse(new)?;
        let Some(row) = self.find_row(&old_number).await? else {
            return Ok(false);
        };
        let value = new.trim();
        let store = &self.store;
        self.with_retry("ledger rename", move |_| {
            store.update_cell(row, KEY_COLUMN, value)
        })
        .await?;
        info!(from = %old_number, to = %new_number, row, "renamed in ledger");
        Ok(true)
    }
}

/// Rows of a full ledger read that carry a usable key, header skipped.
pub fn data_rows(values: &[Vec<String>]) -> impl Iterator<Item = LedgerRow> + '_ {
    values
        .iter()
        .skip(1)
        .map(|cells| LedgerRow::from_cells(cells))
        .filter(|row| !canonicalize(&row.process).is_empty())
}
