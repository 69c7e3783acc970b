//! The narrow interface the monitor uses to reach the ledger.

use crate::error::Result;
use async_trait::async_trait;

/// Tabular store with one header row followed by data rows.
///
/// Row and column numbers are 1-based, matching spreadsheet notation: row 1
/// is the header, column 1 is column A.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every value of one column, header included.
    ///
    /// Trailing empty cells may be omitted.
    async fn column_values(&self, column: usize) -> Result<Vec<String>>;

    /// Overwrite row `row` starting at column A with `cells`.
    async fn update_row(&self, row: usize, cells: &[String]) -> Result<()>;

    /// Append `cells` as a new row after the last non-empty row.
    async fn append_row(&self, cells: &[String]) -> Result<()>;

    /// Whole sheet, header first.
    async fn all_values(&self) -> Result<Vec<Vec<String>>>;

    /// Remove row `row`, shifting later rows up.
    async fn delete_row(&self, row: usize) -> Result<()>;

    /// Overwrite a single cell.
    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<()>;
}

/// Spreadsheet column letters for a 1-based column number (1 → A, 27 → AA).
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(11), "K");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(0), "");
    }
}
