//! In-process ledger used by tests and dry runs.

use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use async_trait::async_trait;
use paineel_core::LedgerRow;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Ledger held in memory.
///
/// Can be told to fail the next N calls, which is how retry behaviour is
/// exercised without a network.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Vec<String>>>,
    failures: AtomicU32,
    rejections: AtomicU32,
    calls: AtomicUsize,
}

impl MemoryLedger {
    /// Empty ledger without a header row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger holding only the standard header row.
    pub fn with_header() -> Self {
        Self::from_rows(vec![LedgerRow::HEADER
            .iter()
            .map(ToString::to_string)
            .collect()])
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Make the next `count` calls fail with `LedgerError::Unavailable`.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls fail with a non-retryable 403 API error.
    pub fn reject_next(&self, count: u32) {
        self.rejections.store(count, Ordering::SeqCst);
    }

    /// Number of store calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copy of the current contents.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<String>>> {
        self.rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn enter(&self, operation: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(LedgerError::Unavailable(operation.to_string()));
        }
        let rejected = self.rejections.load(Ordering::SeqCst);
        if rejected > 0 {
            self.rejections.store(rejected - 1, Ordering::SeqCst);
            return Err(LedgerError::Api {
                status: 403,
                message: format!("{operation}: permission denied"),
            });
        }
        Ok(())
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.is_empty())
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn column_values(&self, column: usize) -> Result<Vec<String>> {
        self.enter("column_values")?;
        let rows = self.lock();
        let mut values: Vec<String> = rows
            .iter()
            .map(|r| {
                column
                    .checked_sub(1)
                    .and_then(|c| r.get(c))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        while values.last().is_some_and(String::is_empty) {
            values.pop();
        }
        Ok(values)
    }

    async fn update_row(&self, row: usize, cells: &[String]) -> Result<()> {
        self.enter("update_row")?;
        let mut rows = self.lock();
        let idx = row.checked_sub(1).ok_or(LedgerError::RowOutOfRange(row))?;
        if idx >= rows.len() {
            rows.resize(idx + 1, Vec::new());
        }
        let target = &mut rows[idx];
        if target.len() < cells.len() {
            target.resize(cells.len(), String::new());
        }
        target[..cells.len()].clone_from_slice(cells);
        Ok(())
    }

    async fn append_row(&self, cells: &[String]) -> Result<()> {
        self.enter("append_row")?;
        let mut rows = self.lock();
        while rows.last().is_some_and(|r| is_blank(r)) {
            rows.pop();
        }
        rows.push(cells.to_vec());
        Ok(())
    }

    async fn all_values(&self) -> Result<Vec<Vec<String>>> {
        self.enter("all_values")?;
        Ok(self.lock().clone())
    }

    async fn delete_row(&self, row: usize) -> Result<()> {
        self.enter("delete_row")?;
        let mut rows = self.lock();
        match row.checked_sub(1) {
            Some(idx) if idx < rows.len() => {
                rows.remove(idx);
                Ok(())
            }
            _ => Err(LedgerError::RowOutOfRange(row)),
        }
    }

    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
        self.enter("update_cell")?;
        let mut rows = self.lock();
        let (Some(r), Some(c)) = (row.checked_sub(1), column.checked_sub(1)) else {
            return Err(LedgerError::RowOutOfRange(row));
        };
        if r >= rows.len() {
            rows.resize(r + 1, Vec::new());
        }
        let target = &mut rows[r];
        if target.len() <= c {
            target.resize(c + 1, String::new());
        }
        target[c] = value.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let ledger = MemoryLedger::with_header();
        ledger.append_row(&cells(&["12345", "Tipo"])).await.unwrap();

        let all = ledger.all_values().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0][0], "PROCESSOS");
        assert_eq!(
            ledger.column_values(1).await.unwrap(),
            cells(&["PROCESSOS", "12345"])
        );
    }

    #[tokio::test]
    async fn test_update_row_overwrites_in_place() {
        let ledger = MemoryLedger::from_rows(vec![cells(&["h"]), cells(&["1", "a"])]);
        ledger.update_row(2, &cells(&["1", "b", "c"])).await.unwrap();
        assert_eq!(ledger.rows()[1], cells(&["1", "b", "c"]));
        assert!(ledger.update_row(0, &cells(&["x"])).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_update_cell() {
        let ledger =
            MemoryLedger::from_rows(vec![cells(&["h"]), cells(&["1"]), cells(&["2"])]);
        ledger.delete_row(2).await.unwrap();
        ledger.update_cell(2, 1, "3").await.unwrap();
        assert_eq!(ledger.rows(), vec![cells(&["h"]), cells(&["3"])]);
        assert!(matches!(
            ledger.delete_row(9).await,
            Err(LedgerError::RowOutOfRange(9))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let ledger = MemoryLedger::with_header();
        ledger.fail_next(2);
        assert!(ledger.all_values().await.is_err());
        assert!(ledger.column_values(1).await.is_err());
        assert!(ledger.all_values().await.is_ok());
        assert_eq!(ledger.calls(), 3);
    }

    #[tokio::test]
    async fn test_column_values_drops_trailing_blanks() {
        let ledger = MemoryLedger::from_rows(vec![
            cells(&["h", "x"]),
            cells(&["", "y"]),
            cells(&["1"]),
            cells(&["", "z"]),
        ]);
        assert_eq!(
            ledger.column_values(1).await.unwrap(),
            cells(&["h", "", "1"])
        );
    }
}
