//! Error types for captcha resolution.

use thiserror::Error;

/// Result type for captcha operations.
pub type Result<T> = std::result::Result<T, CaptchaError>;

/// Errors raised by either solving tier or by the image plumbing around them.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// HTTP transport failure talking to the solving service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The solving service answered with an error code
    #[error("captcha service error: {0}")]
    Service(String),

    /// The solving service did not produce an answer in time
    #[error("captcha service timed out after {0}s")]
    Timeout(u64),

    /// Answer shorter than the accepted minimum
    #[error("answer '{answer}' rejected: fewer than {min_length} characters")]
    Rejected {
        /// Text that was returned
        answer: String,
        /// Minimum accepted length
        min_length: usize,
    },

    /// Local OCR failed to run or produced nothing usable
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// Image decoding or encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Browser interaction failed
    #[error("browser error: {0}")]
    Browser(#[from] paineel_browser::BrowserError),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
