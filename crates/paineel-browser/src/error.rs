use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("no element at index {index} for {selector}")]
    IndexOutOfRange { selector: String, index: usize },

    #[error("script failed: {0}")]
    ScriptError(String),

    #[error("tab not found: {0}")]
    TabNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::ChromiumError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_index_error_names_selector() {
        let err = BrowserError::IndexOutOfRange {
            selector: "a".to_string(),
            index: 4,
        };
        assert_eq!(err.to_string(), "no element at index 4 for a");
    }
}
