use crate::actions::{extract_domain, BrowserActions, ElementSummary, Locator, TabHandle};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Interval between element lookups while waiting
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const IS_VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

const READ_VALUE_JS: &str =
    "function() { return this.value === undefined ? '' : String(this.value); }";

const CLEAR_VALUE_JS: &str = "function() { this.value = ''; }";

const SCRIPT_CLICK_JS: &str = "function() { this.click(); }";

/// Browser automation engine backed by Chromium over CDP
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    active: RwLock<Page>,
    /// Tab ids in the order they were first seen
    tab_order: Mutex<Vec<String>>,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with the configured window and a randomized fingerprint
    pub async fn launch(config: &paineel_core::BrowserConfig) -> Result<Self> {
        let fingerprint = FingerprintConfig::randomized();
        let navigation_timeout = Duration::from_secs(config.navigation_timeout_secs);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .request_timeout(navigation_timeout)
            .args(fingerprint.launch_args());
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(binary) = &config.chrome_binary {
            builder = builder.chrome_executable(binary);
        }
        let browser_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        fingerprint.apply(&page).await?;
        let first_tab = page.target_id().inner().clone();

        info!(headless = config.headless, "browser launched");

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            active: RwLock::new(page),
            tab_order: Mutex::new(vec![first_tab]),
            fingerprint,
            navigation_timeout,
        })
    }

    /// Close the browser process. Safe to call more than once.
    pub async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            debug!("browser close: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("browser wait: {}", e);
        }
        self.handler.abort();
        info!("browser closed");
    }

    async fn find(&self, locator: &Locator) -> Result<Element> {
        let page = self.active.read().await;
        let found = match locator {
            Locator::Css(selector) => page.find_element(selector.as_str()).await,
            Locator::XPath(expression) => page.find_xpath(expression.as_str()).await,
        };
        found.map_err(|_| BrowserError::SelectorNotFound(locator.to_string()))
    }

    async fn find_many(&self, locator: &Locator) -> Result<Vec<Element>> {
        let page = self.active.read().await;
        let found = match locator {
            Locator::Css(selector) => page.find_elements(selector.as_str()).await,
            Locator::XPath(expression) => page.find_xpaths(expression.as_str()).await,
        };
        // CDP reports "no node" as an error; callers want an empty list
        Ok(found.unwrap_or_default())
    }

    async fn nth(&self, locator: &Locator, index: usize) -> Result<Element> {
        self.find_many(locator)
            .await?
            .into_iter()
            .nth(index)
            .ok_or_else(|| BrowserError::IndexOutOfRange {
                selector: locator.to_string(),
                index,
            })
    }

    async fn pages(&self) -> Result<Vec<Page>> {
        let browser = self.browser.lock().await;
        Ok(browser.pages().await?)
    }
}

async fn eval_bool(element: &Element, function: &str) -> Result<bool> {
    let returns = element
        .call_js_fn(function, false)
        .await
        .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
    Ok(returns
        .result
        .value
        .and_then(|v| v.as_bool())
        .unwrap_or(false))
}

async fn eval_unit(element: &Element, function: &str) -> Result<()> {
    element
        .call_js_fn(function, false)
        .await
        .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        let domain = extract_domain(url)?;
        debug!(domain = %domain, "navigating");

        let page = self.active.read().await;
        tokio::time::timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigation to {domain}")))?
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        self.locate(std::slice::from_ref(locator), timeout)
            .await
            .map(|_| ())
    }

    async fn locate(&self, locators: &[Locator], timeout: Duration) -> Result<Locator> {
        let deadline = Instant::now() + timeout;
        loop {
            for locator in locators {
                if self.find(locator).await.is_ok() {
                    return Ok(locator.clone());
                }
            }
            if Instant::now() >= deadline {
                let tried: Vec<String> = locators.iter().map(ToString::to_string).collect();
                return Err(BrowserError::SelectorNotFound(tried.join(" | ")));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn exists(&self, locator: &Locator) -> Result<bool> {
        Ok(self.find(locator).await.is_ok())
    }

    async fn set_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.find(locator).await?;
        element.click().await?;
        eval_unit(&element, CLEAR_VALUE_JS).await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn read_value(&self, locator: &Locator) -> Result<String> {
        let element = self.find(locator).await?;
        let returns = element
            .call_js_fn(READ_VALUE_JS, false)
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_str().map(ToString::to_string))
            .unwrap_or_default())
    }

    async fn script_set_value(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.find(locator).await?;
        let literal =
            serde_json::to_string(value).map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        let function = format!(
            "function() {{ this.value = {literal}; \
             this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}"
        );
        eval_unit(&element, &function).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.find(locator).await?;
        element.click().await?;
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementSummary>> {
        let elements = self.find_many(locator).await?;
        let mut summaries = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let text = element.inner_text().await?.unwrap_or_default();
            let visible = eval_bool(element, IS_VISIBLE_JS).await.unwrap_or(false);
            summaries.push(ElementSummary {
                index,
                text,
                visible,
            });
        }
        Ok(summaries)
    }

    async fn click_nth(&self, locator: &Locator, index: usize) -> Result<()> {
        let element = self.nth(locator, index).await?;
        element.click().await?;
        Ok(())
    }

    async fn script_click_nth(&self, locator: &Locator, index: usize) -> Result<()> {
        let element = self.nth(locator, index).await?;
        eval_unit(&element, SCRIPT_CLICK_JS).await
    }

    async fn screenshot_element(&self, locator: &Locator) -> Result<Vec<u8>> {
        let element = self.find(locator).await?;
        Ok(element.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    async fn content(&self) -> Result<String> {
        let page = self.active.read().await;
        Ok(page.content().await?)
    }

    async fn list_tabs(&self) -> Result<Vec<TabHandle>> {
        let pages = self.pages().await?;
        let mut order = self.tab_order.lock().await;

        let live: Vec<String> = pages.iter().map(|p| p.target_id().inner().clone()).collect();
        order.retain(|id| live.contains(id));
        for id in &live {
            if !order.contains(id) {
                order.push(id.clone());
            }
        }

        let mut tabs = Vec::with_capacity(order.len());
        for id in order.iter() {
            if let Some(page) = pages.iter().find(|p| p.target_id().inner() == id) {
                tabs.push(TabHandle {
                    id: id.clone(),
                    url: page.url().await.unwrap_or(None),
                });
            }
        }
        Ok(tabs)
    }

    async fn switch_tab(&self, id: &str) -> Result<()> {
        let page = self
            .pages()
            .await?
            .into_iter()
            .find(|p| p.target_id().inner() == id)
            .ok_or_else(|| BrowserError::TabNotFound(id.to_string()))?;

        if let Err(e) = self.fingerprint.apply(&page).await {
            warn!("could not apply fingerprint to tab {}: {}", id, e);
        }
        page.bring_to_front().await?;
        *self.active.write().await = page;
        debug!(tab = id, "switched active tab");
        Ok(())
    }

    async fn active_tab(&self) -> Result<String> {
        Ok(self.active.read().await.target_id().inner().clone())
    }

    async fn close_other_tabs(&self) -> Result<()> {
        let active = self.active_tab().await?;
        for page in self.pages().await? {
            if page.target_id().inner() != &active {
                if let Err(e) = page.close().await {
                    debug!("closing tab: {}", e);
                }
            }
        }
        self.tab_order.lock().await.retain(|id| id == &active);
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<()> {
        let page = self.active.read().await;
        page.execute(ClearBrowserCookiesParams::default()).await?;
        debug!("cookies cleared");
        Ok(())
    }
}

impl Drop for BrowserEngine {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
