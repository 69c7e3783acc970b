//! Search flow that turns a process number into an extracted record.

use crate::error::{ExtractStage, MonitorError, Result};
use crate::parser::parse_record;
use paineel_browser::{BrowserActions, Locator};
use paineel_captcha::CaptchaResolver;
use paineel_core::{AppConfig, ProcessNumber, ProcessRecord};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Locators and settle intervals of the search flow.
#[derive(Debug, Clone)]
pub struct ExtractorSettings {
    pub search_url: String,
    /// Tried in order, first match wins
    pub process_field: Vec<Locator>,
    pub captcha_input: Locator,
    pub search_button: Locator,
    pub result_links: Locator,
    pub locate_timeout: Duration,
    pub field_settle: Duration,
    pub search_settle: Duration,
    pub result_settle: Duration,
}

impl ExtractorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let target = &config.target;
        let execution = &config.execution;
        Self {
            search_url: target.search_url.clone(),
            process_field: target.process_field.iter().map(|s| Locator::parse(s)).collect(),
            captcha_input: Locator::parse(&target.captcha_input),
            search_button: Locator::parse(&target.search_button),
            result_links: Locator::parse(&target.result_links),
            locate_timeout: Duration::from_millis(target.locate_timeout_ms),
            field_settle: Duration::from_millis(execution.field_settle_ms),
            search_settle: Duration::from_millis(execution.search_settle_ms),
            result_settle: Duration::from_millis(execution.result_settle_ms),
        }
    }
}

async fn field_holds(browser: &dyn BrowserActions, field: &Locator, raw: &str) -> bool {
    match browser.read_value(field).await {
        Ok(value) => value.trim() == raw,
        Err(e) => {
            debug!("reading field back: {}", e);
            false
        }
    }
}

/// Position in the search flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Start,
    FormLoaded,
    FieldFilled,
    CaptchaSolved,
    Submitted,
    ResultFound,
    ResultNotFound,
}

/// Drives the target application's search form for one process number at a
/// time.
///
/// Either returns the parsed record with the browser on the process page, or
/// an [`MonitorError::Extraction`] naming the stage that gave up. Cookie and
/// tab cleanup between numbers is the caller's job.
pub struct ProcessExtractor {
    resolver: CaptchaResolver,
    settings: ExtractorSettings,
}

impl ProcessExtractor {
    pub fn new(resolver: CaptchaResolver, settings: ExtractorSettings) -> Self {
        Self { resolver, settings }
    }

    /// Remove challenge images left by the last attempt.
    pub fn purge_captchas(&self) -> usize {
        self.resolver.purge()
    }

    pub async fn extract(
        &self,
        browser: &dyn BrowserActions,
        raw: &str,
    ) -> Result<ProcessRecord> {
        let number = ProcessNumber::parse(raw)?;
        let raw = raw.trim();
        let mut state = SearchState::Start;

        loop {
            state = match state {
                SearchState::Start => {
                    self.load_form(browser).await?;
                    SearchState::FormLoaded
                }
                SearchState::FormLoaded => {
                    self.fill_field(browser, raw).await?;
                    SearchState::FieldFilled
                }
                SearchState::FieldFilled => {
                    self.solve_captcha(browser).await?;
                    SearchState::CaptchaSolved
                }
                SearchState::CaptchaSolved => {
                    self.submit(browser).await?;
                    SearchState::Submitted
                }
                SearchState::Submitted => {
                    if self.open_result(browser, &number).await? {
                        SearchState::ResultFound
                    } else {
                        SearchState::ResultNotFound
                    }
                }
                SearchState::ResultFound => return self.read_record(browser, raw).await,
                SearchState::ResultNotFound => {
                    return Err(MonitorError::extraction(
                        ExtractStage::ResultFound,
                        format!("no visible result matches {number}"),
                    ))
                }
            };
            debug!(process = %number, ?state, "search advanced");
        }
    }

    async fn load_form(&self, browser: &dyn BrowserActions) -> Result<()> {
        browser
            .navigate(&self.settings.search_url)
            .await
            .map_err(|e| MonitorError::extraction(ExtractStage::FormLoaded, e))?;
        browser
            .wait_for(&Locator::css("body"), self.settings.locate_timeout)
            .await
            .map_err(|e| MonitorError::extraction(ExtractStage::FormLoaded, e))
    }

    /// Set the field, read it back, and force it through the DOM once on
    /// mismatch.
    async fn fill_field(&self, browser: &dyn BrowserActions, raw: &str) -> Result<()> {
        let stage = ExtractStage::FieldFilled;
        let field = browser
            .locate(&self.settings.process_field, self.settings.locate_timeout)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;
        debug!(locator = %field, "process field located");

        browser
            .set_value(&field, raw)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;
        sleep(self.settings.field_settle).await;
        if field_holds(browser, &field, raw).await {
            return Ok(());
        }

        warn!(locator = %field, "typed value did not stick, setting it by script");
        browser
            .script_set_value(&field, raw)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;
        sleep(self.settings.field_settle).await;
        if field_holds(browser, &field, raw).await {
            Ok(())
        } else {
            Err(MonitorError::extraction(stage, "field value does not match input"))
        }
    }

    async fn solve_captcha(&self, browser: &dyn BrowserActions) -> Result<()> {
        let stage = ExtractStage::CaptchaSolved;
        let input = &self.settings.captcha_input;
        let present = browser
            .exists(input)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;
        if !present {
            return Err(MonitorError::extraction(stage, "captcha input not found"));
        }

        let answer = self.resolver.resolve(browser).await;
        if answer.is_empty() {
            return Err(MonitorError::extraction(stage, "captcha attempts exhausted"));
        }

        browser
            .set_value(input, &answer)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))
    }

    async fn submit(&self, browser: &dyn BrowserActions) -> Result<()> {
        browser
            .click(&self.settings.search_button)
            .await
            .map_err(|e| MonitorError::extraction(ExtractStage::Submitted, e))?;
        sleep(self.settings.search_settle).await;
        Ok(())
    }

    /// Click the first visible link whose text names `number`. `false` when
    /// none does.
    async fn open_result(
        &self,
        browser: &dyn BrowserActions,
        number: &ProcessNumber,
    ) -> Result<bool> {
        let stage = ExtractStage::ResultFound;
        let links = &self.settings.result_links;
        let candidates = browser
            .find_all(links)
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;

        let Some(hit) = candidates
            .iter()
            .find(|c| c.visible && number.matches(&c.text))
        else {
            debug!(process = %number, scanned = candidates.len(), "no matching result");
            return Ok(false);
        };

        if let Err(e) = browser.click_nth(links, hit.index).await {
            debug!("direct click failed, clicking by script: {}", e);
            browser
                .script_click_nth(links, hit.index)
                .await
                .map_err(|e| MonitorError::extraction(stage, e))?;
        }
        sleep(self.settings.result_settle).await;

        let tabs = browser
            .list_tabs()
            .await
            .map_err(|e| MonitorError::extraction(stage, e))?;
        if tabs.len() > 1 {
            if let Some(newest) = tabs.last() {
                browser
                    .switch_tab(&newest.id)
                    .await
                    .map_err(|e| MonitorError::extraction(stage, e))?;
                debug!(tab = %newest.id, "switched to result tab");
            }
        }
        Ok(true)
    }

    async fn read_record(&self, browser: &dyn BrowserActions, raw: &str) -> Result<ProcessRecord> {
        let html = browser
            .content()
            .await
            .map_err(|e| MonitorError::extraction(ExtractStage::RecordRead, e))?;
        let record = parse_record(&html, raw);
        info!(
            process = %record.identifier,
            documents = record.documents.len(),
            progress = record.progress.len(),
            "record extracted"
        );
        Ok(record)
    }
}
