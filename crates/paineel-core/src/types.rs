//! Shared domain types.
//!
//! Process numbers are compared by their canonical (digits-only) form, and
//! every extracted record flattens into one fixed-width ledger row.

use crate::error::PaineelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip every non-digit character from a raw process number.
///
/// Idempotent: canonicalizing an already canonical value returns it unchanged.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Canonical (digits-only) process number.
///
/// Two process numbers are equal iff their canonical forms are equal, so
/// `48500.000123/2024-01` and `4850000012320240 1` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessNumber(String);

impl ProcessNumber {
    /// Minimum number of digits for a canonical form to be accepted.
    pub const MIN_DIGITS: usize = 5;

    /// Canonicalize and validate a raw process number.
    ///
    /// # Errors
    /// Returns `PaineelError::Validation` when fewer than `MIN_DIGITS` digits remain.
    pub fn parse(raw: &str) -> Result<Self, PaineelError> {
        let canonical = canonicalize(raw.trim());
        if canonical.len() < Self::MIN_DIGITS {
            return Err(PaineelError::Validation(format!(
                "process number '{raw}' has {} digit(s), at least {} required",
                canonical.len(),
                Self::MIN_DIGITS
            )));
        }
        Ok(Self(canonical))
    }

    /// Get the canonical digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a raw value canonicalizes to this process number.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        canonicalize(raw) == self.0
    }
}

impl fmt::Display for ProcessNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a record's document list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub number: String,
    pub kind: String,
    pub date: String,
    pub inclusion_date: String,
    pub unit: String,
}

/// One entry of a record's progress history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub date: String,
    pub unit: String,
    pub description: String,
}

/// Data extracted from the target application for one process.
///
/// Lives only for the duration of a single processing attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process number as displayed by the target application
    pub identifier: String,
    /// Process type
    pub kind: String,
    /// Interested parties, `"; "`-joined
    pub interested_parties: String,
    pub documents: Vec<DocumentEntry>,
    pub progress: Vec<ProgressEntry>,
}

/// Persisted form of a `ProcessRecord`: one ledger row, fixed column order.
///
/// Column A holds the process number; columns B..K hold the remaining fields,
/// with multi-entry lists newline-joined inside a single cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub process: String,
    pub kind: String,
    pub interested_parties: String,
    pub document_numbers: String,
    pub document_types: String,
    pub document_dates: String,
    pub document_inclusion_dates: String,
    pub document_units: String,
    pub progress_dates: String,
    pub progress_units: String,
    pub progress_descriptions: String,
}

impl LedgerRow {
    /// Number of columns (A..K).
    pub const COLUMN_COUNT: usize = 11;

    /// Letter of the last column, for range notation.
    pub const LAST_COLUMN: char = 'K';

    /// Header row written to a fresh ledger.
    pub const HEADER: [&'static str; Self::COLUMN_COUNT] = [
        "PROCESSOS",
        "Tipo do processo",
        "Interessados",
        "Documento",
        "Tipo do documento",
        "Data do documento",
        "Data de Inclusão",
        "Unidade",
        "Data/Hora do Andamento",
        "Unidade do Andamento",
        "Descrição do Andamento",
    ];

    /// Flatten an extracted record into ledger cells.
    #[must_use]
    pub fn from_record(record: &ProcessRecord) -> Self {
        fn join<T>(items: &[T], field: impl Fn(&T) -> &str) -> String {
            items.iter().map(field).collect::<Vec<_>>().join("\n")
        }

        Self {
            process: record.identifier.clone(),
            kind: record.kind.clone(),
            interested_parties: record.interested_parties.clone(),
            document_numbers: join(&record.documents, |d| &d.number),
            document_types: join(&record.documents, |d| &d.kind),
            document_dates: join(&record.documents, |d| &d.date),
            document_inclusion_dates: join(&record.documents, |d| &d.inclusion_date),
            document_units: join(&record.documents, |d| &d.unit),
            progress_dates: join(&record.progress, |p| &p.date),
            progress_units: join(&record.progress, |p| &p.unit),
            progress_descriptions: join(&record.progress, |p| &p.description),
        }
    }

    /// Build a row from raw cells; short rows are padded with empty cells.
    #[must_use]
    pub fn from_cells(cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
        Self {
            process: cell(0),
            kind: cell(1),
            interested_parties: cell(2),
            document_numbers: cell(3),
            document_types: cell(4),
            document_dates: cell(5),
            document_inclusion_dates: cell(6),
            document_units: cell(7),
            progress_dates: cell(8),
            progress_units: cell(9),
            progress_descriptions: cell(10),
        }
    }

    /// Cells in column order A..K.
    #[must_use]
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.process.clone(),
            self.kind.clone(),
            self.interested_parties.clone(),
            self.document_numbers.clone(),
            self.document_types.clone(),
            self.document_dates.clone(),
            self.document_inclusion_dates.clone(),
            self.document_units.clone(),
            self.progress_dates.clone(),
            self.progress_units.clone(),
            self.progress_descriptions.clone(),
        ]
    }

    /// Canonical key of this row (column A).
    #[must_use]
    pub fn key(&self) -> String {
        canonicalize(&self.process)
    }
}
