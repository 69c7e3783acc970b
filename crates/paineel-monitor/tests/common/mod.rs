//! Scripted stand-ins for the SEI search site, the captcha tiers and the
//! notification channel.

#![allow(dead_code)]

use async_trait::async_trait;
use paineel_browser::{BrowserActions, ElementSummary, Locator, TabHandle};
use paineel_captcha::{
    CaptchaError, CaptchaResolver, OcrEngine, RemoteSolver, ResolverSettings,
};
use paineel_core::{canonicalize, AppConfig};
use paineel_monitor::{
    ExtractorSettings, MonitorError, Notification, Notifier, ProcessExtractor,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const CAPTCHA_INPUT: &str = "#txtInfraCaptcha";
const SEARCH_BUTTON: &str = "#sbmPesquisar";

/// HTML of a process page as served by the search site.
pub fn process_page(identifier: &str, kind: &str, progress: &[&str]) -> String {
    let rows: String = progress
        .iter()
        .enumerate()
        .map(|(i, d)| {
            format!(
                r#"<tr class="andamento"><td>0{}/01/2024 10:00</td><td>SCG</td><td>{d}</td></tr>"#,
                i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <table id="tblCabecalho">
            <tr><td>Processo:</td><td>{identifier}</td></tr>
            <tr><td>Tipo:</td><td>{kind}</td></tr>
            <tr><td>Interessados:</td><td><span>ACME Energia</span></td></tr>
        </table>
        <table id="tblDocumentos">
            <tr><th></th><th>Documento</th></tr>
            <tr><td></td><td>101</td><td>Ofício</td><td>01/01/2024</td><td>01/01/2024</td><td>SCG</td></tr>
        </table>
        <table>{rows}</table>
        </body></html>"#
    )
}

/// Search site keyed by canonical process number.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, String>>,
    /// Searches left that return no matching link
    misses: Mutex<HashMap<String, u32>>,
    /// When set, typed input is dropped and only scripted input sticks
    pub typing_ignored: bool,
    script_ignored: bool,
    field_missing: bool,
    click_fails: bool,
    opens_tab: bool,
    hidden_links: bool,
    field: Mutex<String>,
    searched: Mutex<Option<String>>,
    opened: Mutex<Option<String>>,
    result_tab: Mutex<bool>,
    active: Mutex<Option<String>>,
    clicked: Mutex<Option<usize>>,
    pub navigations: AtomicUsize,
    pub cookie_clears: AtomicUsize,
    pub script_sets: AtomicUsize,
    pub script_clicks: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Site whose process field drops typed input.
    pub fn ignoring_typing() -> Self {
        Self {
            typing_ignored: true,
            ..Self::default()
        }
    }

    /// Scripted input is dropped as well.
    pub fn ignoring_script(mut self) -> Self {
        self.script_ignored = true;
        self
    }

    /// No locator finds the process field.
    pub fn without_field(mut self) -> Self {
        self.field_missing = true;
        self
    }

    /// Direct clicks on result links fail; scripted clicks work.
    pub fn with_failing_clicks(mut self) -> Self {
        self.click_fails = true;
        self
    }

    /// Results open in a new tab.
    pub fn opening_tabs(mut self) -> Self {
        self.opens_tab = true;
        self
    }

    /// A hidden link with the searched number precedes the visible one.
    pub fn with_hidden_links(mut self) -> Self {
        self.hidden_links = true;
        self
    }

    pub fn with_page(self, identifier: &str, html: String) -> Self {
        self.set_page(identifier, html);
        self
    }

    pub fn set_page(&self, identifier: &str, html: String) {
        self.pages
            .lock()
            .unwrap()
            .insert(canonicalize(identifier), html);
    }

    /// The next `count` searches for `identifier` find nothing.
    pub fn miss(&self, identifier: &str, count: u32) {
        self.misses
            .lock()
            .unwrap()
            .insert(canonicalize(identifier), count);
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn cookie_clears(&self) -> usize {
        self.cookie_clears.load(Ordering::SeqCst)
    }

    pub fn script_clicks(&self) -> usize {
        self.script_clicks.load(Ordering::SeqCst)
    }

    /// Index of the last result link clicked.
    pub fn clicked(&self) -> Option<usize> {
        *self.clicked.lock().unwrap()
    }

    /// Tab the extractor switched to, if any.
    pub fn active(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    fn result_index(&self) -> usize {
        if self.hidden_links {
            3
        } else {
            2
        }
    }

    fn open_link(&self, index: usize) {
        *self.clicked.lock().unwrap() = Some(index);
        if index != self.result_index() {
            return;
        }
        let searched = self.searched.lock().unwrap().clone();
        *self.opened.lock().unwrap() = searched.map(|s| canonicalize(&s));
        if self.opens_tab {
            *self.result_tab.lock().unwrap() = true;
        }
    }
}

#[async_trait]
impl BrowserActions for FakeSite {
    async fn navigate(&self, _url: &str) -> paineel_browser::Result<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        self.field.lock().unwrap().clear();
        *self.searched.lock().unwrap() = None;
        *self.opened.lock().unwrap() = None;
        Ok(())
    }

    async fn wait_for(&self, _l: &Locator, _t: std::time::Duration) -> paineel_browser::Result<()> {
        Ok(())
    }

    async fn locate(
        &self,
        locators: &[Locator],
        _t: std::time::Duration,
    ) -> paineel_browser::Result<Locator> {
        if self.field_missing {
            return Err(paineel_browser::BrowserError::SelectorNotFound(
                locators.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            ));
        }
        locators
            .first()
            .cloned()
            .ok_or_else(|| paineel_browser::BrowserError::SelectorNotFound("none".into()))
    }

    async fn exists(&self, _l: &Locator) -> paineel_browser::Result<bool> {
        Ok(true)
    }

    async fn set_value(&self, l: &Locator, value: &str) -> paineel_browser::Result<()> {
        if l.as_str() != CAPTCHA_INPUT && !self.typing_ignored {
            *self.field.lock().unwrap() = value.to_string();
        }
        Ok(())
    }

    async fn read_value(&self, _l: &Locator) -> paineel_browser::Result<String> {
        Ok(self.field.lock().unwrap().clone())
    }

    async fn script_set_value(&self, _l: &Locator, value: &str) -> paineel_browser::Result<()> {
        self.script_sets.fetch_add(1, Ordering::SeqCst);
        if !self.script_ignored {
            *self.field.lock().unwrap() = value.to_string();
        }
        Ok(())
    }

    async fn click(&self, l: &Locator) -> paineel_browser::Result<()> {
        if l.as_str() == SEARCH_BUTTON {
            let typed = self.field.lock().unwrap().clone();
            *self.searched.lock().unwrap() = Some(typed);
        }
        Ok(())
    }

    async fn find_all(&self, _l: &Locator) -> paineel_browser::Result<Vec<ElementSummary>> {
        let mut links = vec![
            ElementSummary {
                index: 0,
                text: "Pesquisar".to_string(),
                visible: true,
            },
            ElementSummary {
                index: 1,
                text: "Ajuda".to_string(),
                visible: false,
            },
        ];
        let Some(typed) = self.searched.lock().unwrap().clone() else {
            return Ok(links);
        };
        let key = canonicalize(&typed);

        let mut misses = self.misses.lock().unwrap();
        if let Some(left) = misses.get_mut(&key) {
            if *left > 0 {
                *left -= 1;
                return Ok(links);
            }
        }
        if self.pages.lock().unwrap().contains_key(&key) {
            if self.hidden_links {
                links.push(ElementSummary {
                    index: 2,
                    text: typed.clone(),
                    visible: false,
                });
            }
            links.push(ElementSummary {
                index: self.result_index(),
                text: typed,
                visible: true,
            });
        }
        Ok(links)
    }

    async fn click_nth(&self, _l: &Locator, index: usize) -> paineel_browser::Result<()> {
        if self.click_fails {
            return Err(paineel_browser::BrowserError::ChromiumError(
                "element is not clickable".to_string(),
            ));
        }
        self.open_link(index);
        Ok(())
    }

    async fn script_click_nth(&self, _l: &Locator, index: usize) -> paineel_browser::Result<()> {
        self.script_clicks.fetch_add(1, Ordering::SeqCst);
        self.open_link(index);
        Ok(())
    }

    async fn screenshot_element(&self, _l: &Locator) -> paineel_browser::Result<Vec<u8>> {
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn content(&self) -> paineel_browser::Result<String> {
        if self.opens_tab && self.active().as_deref() != Some("result") {
            return Ok("<html><body></body></html>".to_string());
        }
        let opened = self.opened.lock().unwrap().clone();
        Ok(opened
            .and_then(|key| self.pages.lock().unwrap().get(&key).cloned())
            .unwrap_or_default())
    }

    async fn list_tabs(&self) -> paineel_browser::Result<Vec<TabHandle>> {
        let mut tabs = vec![TabHandle {
            id: "main".to_string(),
            url: None,
        }];
        if *self.result_tab.lock().unwrap() {
            tabs.push(TabHandle {
                id: "result".to_string(),
                url: None,
            });
        }
        Ok(tabs)
    }

    async fn switch_tab(&self, id: &str) -> paineel_browser::Result<()> {
        *self.active.lock().unwrap() = Some(id.to_string());
        Ok(())
    }

    async fn active_tab(&self) -> paineel_browser::Result<String> {
        Ok(self.active().unwrap_or_else(|| "main".to_string()))
    }

    async fn close_other_tabs(&self) -> paineel_browser::Result<()> {
        *self.result_tab.lock().unwrap() = false;
        *self.active.lock().unwrap() = None;
        Ok(())
    }

    async fn clear_cookies(&self) -> paineel_browser::Result<()> {
        self.cookie_clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FixedRemote(pub &'static str);

#[async_trait]
impl RemoteSolver for FixedRemote {
    async fn solve(&self, _png: &[u8]) -> paineel_captcha::Result<String> {
        Ok(self.0.to_string())
    }
    async fn balance(&self) -> paineel_captcha::Result<f64> {
        Ok(1.0)
    }
}

pub struct FailingRemote;

#[async_trait]
impl RemoteSolver for FailingRemote {
    async fn solve(&self, _png: &[u8]) -> paineel_captcha::Result<String> {
        Err(CaptchaError::Service("ERROR_ZERO_BALANCE".to_string()))
    }
    async fn balance(&self) -> paineel_captcha::Result<f64> {
        Ok(0.0)
    }
}

pub struct BlankOcr;

#[async_trait]
impl OcrEngine for BlankOcr {
    async fn recognize(&self, _image: &Path) -> paineel_captcha::Result<String> {
        Ok(String::new())
    }
}

/// Notifier keeping every notification it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Notification> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), MonitorError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Default configuration with challenge images kept under `temp_dir`.
pub fn config(temp_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.temp_dir = temp_dir.to_path_buf();
    config.paths.data_dir = temp_dir.join("data");
    config
}

pub fn extractor(config: &AppConfig, remote: Box<dyn RemoteSolver>) -> ProcessExtractor {
    let resolver = CaptchaResolver::new(
        remote,
        Box::new(BlankOcr),
        ResolverSettings::from_config(config),
    );
    ProcessExtractor::new(resolver, ExtractorSettings::from_config(config))
}
