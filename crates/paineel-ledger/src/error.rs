//! Ledger error types.

use thiserror::Error;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The spreadsheet API answered with a non-success status
    #[error("sheets API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// Service-account credentials could not be read or used
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Token exchange failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Worksheet title not present in the spreadsheet
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),

    /// Row index outside the current ledger
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),

    /// Malformed API payload
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Injected failure (in-memory store)
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Whether retrying the same call may succeed: network failures, rate
    /// limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => match e.status() {
                Some(status) => status.as_u16() == 429 || status.is_server_error(),
                None => true,
            },
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) => true,
            Self::Credentials(_)
            | Self::Auth(_)
            | Self::WorksheetNotFound(_)
            | Self::RowOutOfRange(_)
            | Self::Json(_)
            | Self::Io(_) => false,
        }
    }
}
