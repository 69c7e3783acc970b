use paineel_core::PaineelError;
use std::fmt;
use thiserror::Error;

/// Where in the search flow an extraction gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    /// Loading the search form
    FormLoaded,
    /// Locating and filling the process number field
    FieldFilled,
    /// Resolving and entering the captcha
    CaptchaSolved,
    /// Submitting the search
    Submitted,
    /// Scanning results for the process link
    ResultFound,
    /// Reading the process page
    RecordRead,
}

impl fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FormLoaded => "form",
            Self::FieldFilled => "process field",
            Self::CaptchaSolved => "captcha",
            Self::Submitted => "search",
            Self::ResultFound => "result list",
            Self::RecordRead => "process page",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid process number: {0}")]
    Validation(String),

    #[error("{operation} failed after retries: {message}")]
    TransientIo { operation: String, message: String },

    #[error("extraction failed at {stage}: {reason}")]
    Extraction { stage: ExtractStage, reason: String },

    #[error("fatal configuration error: {0}")]
    FatalConfig(String),

    #[error("run cancelled by user")]
    UserCancellation,

    #[error("notification failed: {0}")]
    Notification(String),
}

impl MonitorError {
    pub(crate) fn extraction(stage: ExtractStage, reason: impl ToString) -> Self {
        Self::Extraction {
            stage,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transient(operation: &str, err: impl ToString) -> Self {
        Self::TransientIo {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Errors that end the whole run rather than one process number.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalConfig(_) | Self::UserCancellation)
    }
}

impl From<PaineelError> for MonitorError {
    fn from(err: PaineelError) -> Self {
        match err {
            PaineelError::Validation(msg) => Self::Validation(msg),
            PaineelError::Cancelled => Self::UserCancellation,
            PaineelError::Config(e) => Self::FatalConfig(e.to_string()),
            PaineelError::Io(e) => Self::transient("filesystem", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
