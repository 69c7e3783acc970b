use crate::error::{BrowserError, Result};
use std::fmt;
use std::time::Duration;

/// How to find an element on the active page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    /// Prefix marking a configured locator as XPath.
    pub const XPATH_PREFIX: &'static str = "xpath:";

    /// Parse a configured locator; `xpath:` selects XPath, anything else is CSS.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(Self::XPATH_PREFIX) {
            Some(xpath) => Self::XPath(xpath.trim().to_string()),
            None => Self::Css(raw.trim().to_string()),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css:{s}"),
            Self::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Text and visibility of one element matched by [`BrowserActions::find_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSummary {
    /// Position among the matches, usable with `click_nth`
    pub index: usize,
    pub text: String,
    pub visible: bool,
}

/// An open browser tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabHandle {
    pub id: String,
    pub url: Option<String>,
}

/// Browser actions for automation.
///
/// Every call acts on the active tab. Implementations exist once per
/// automation engine; the monitor only ever talks to this trait.
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate the active tab to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until an element matches `locator`
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()>;

    /// Try each locator in order and return the first one that matches
    async fn locate(&self, locators: &[Locator], timeout: Duration) -> Result<Locator>;

    /// Whether an element currently matches
    async fn exists(&self, locator: &Locator) -> Result<bool>;

    /// Clear an input and type `value` into it
    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Current `value` of an input
    async fn read_value(&self, locator: &Locator) -> Result<String>;

    /// Assign `value` through the DOM, firing input/change events
    async fn script_set_value(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Click the first element matching `locator`
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Summaries of every element matching `locator`, in document order
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementSummary>>;

    /// Click the `index`-th match of `locator`
    async fn click_nth(&self, locator: &Locator, index: usize) -> Result<()>;

    /// Click the `index`-th match through `HTMLElement.click()`
    async fn script_click_nth(&self, locator: &Locator, index: usize) -> Result<()>;

    /// PNG screenshot of a single element
    async fn screenshot_element(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Full HTML of the active tab
    async fn content(&self) -> Result<String>;

    /// Open tabs, oldest first
    async fn list_tabs(&self) -> Result<Vec<TabHandle>>;

    /// Make the tab with `id` the active one
    async fn switch_tab(&self, id: &str) -> Result<()>;

    /// Identifier of the active tab
    async fn active_tab(&self) -> Result<String>;

    /// Close every tab except the active one
    async fn close_other_tabs(&self) -> Result<()>;

    /// Drop all cookies of the browser session
    async fn clear_cookies(&self) -> Result<()>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://sei.aneel.gov.br/sei/modulos/pesquisa/x.php").unwrap(),
            "sei.aneel.gov.br"
        );
        assert!(extract_domain("about:blank").is_err());
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert!(extract_domain("not-a-url").is_err());
    }

    #[test]
    fn test_locator_parse() {
        assert_eq!(
            Locator::parse("#txtProtocoloPesquisa"),
            Locator::css("#txtProtocoloPesquisa")
        );
        assert_eq!(
            Locator::parse("xpath://input[@name='txtProtocoloPesquisa']"),
            Locator::xpath("//input[@name='txtProtocoloPesquisa']")
        );
        assert_eq!(Locator::parse("xpath: //a").as_str(), "//a");
    }

    #[test]
    fn test_locator_display_keeps_kind() {
        assert_eq!(Locator::css("a").to_string(), "css:a");
        assert_eq!(Locator::xpath("//a").to_string(), "xpath://a");
    }
}
