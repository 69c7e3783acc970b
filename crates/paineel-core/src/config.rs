//! Configuration management for PAINEEL.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The configuration is loaded once at
//! startup and handed by reference to every component constructor.

use crate::error::{ConfigError, ConfigResult};
use crate::retry::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "PAINEEL_CONFIG";

/// Main application configuration.
///
/// Loaded from `~/.config/paineel/config.toml` (or platform equivalent)
/// unless a path is given explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Batch execution limits
    pub execution: ExecutionConfig,
    /// Target application entry point and element locators
    pub target: TargetConfig,
    /// Remote captcha service
    pub captcha: CaptchaConfig,
    /// Local OCR fallback
    pub ocr: OcrConfig,
    /// Spreadsheet ledger
    pub ledger: LedgerConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// SMTP transport
    pub smtp: SmtpConfig,
    /// Notification recipients
    pub email: EmailConfig,
    /// Data and scratch directories
    pub paths: PathsConfig,
    /// Log verbosity
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file is absent.
    ///
    /// Resolution order: explicit `path`, then `PAINEEL_CONFIG`, then the
    /// XDG default.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) if !p.is_empty() => PathBuf::from(p),
                _ => Self::config_path()?,
            },
        };

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            Self::from_file(&config_path)
        } else if path.is_some() {
            Err(ConfigError::NotFound {
                path: config_path.display().to_string(),
            })
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse a specific TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PAINEEL_TWOCAPTCHA_KEY`: captcha service API key
    /// - `PAINEEL_SMTP_PASSWORD`: SMTP password
    /// - `PAINEEL_HEADLESS`: browser headless mode (true/false)
    /// - `PAINEEL_MAX_EXECUTION_SECS`: wall-clock budget in seconds
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("PAINEEL_TWOCAPTCHA_KEY") {
            if !val.is_empty() {
                self.captcha.api_key = val;
                tracing::debug!("Override captcha.api_key from env");
            }
        }

        if let Ok(val) = std::env::var("PAINEEL_SMTP_PASSWORD") {
            if !val.is_empty() {
                self.smtp.password = val;
                tracing::debug!("Override smtp.password from env");
            }
        }

        if let Ok(val) = std::env::var("PAINEEL_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("PAINEEL_MAX_EXECUTION_SECS") {
            if let Ok(secs) = val.parse() {
                self.execution.max_execution_secs = secs;
                tracing::debug!("Override execution.max_execution_secs from env: {}", secs);
            }
        }
    }

    /// Default configuration file path: `~/.config/paineel/config.toml`.
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Required keys that are missing or point at absent files.
    ///
    /// An empty list means the run may start.
    #[must_use]
    pub fn validate_required(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.captcha.api_key.trim().is_empty() {
            missing.push("captcha.api_key".to_string());
        }
        match &self.ledger.credentials_file {
            None => missing.push("ledger.credentials_file".to_string()),
            Some(path) if !path.exists() => missing.push(format!(
                "ledger.credentials_file (not found: {})",
                path.display()
            )),
            Some(_) => {}
        }
        if self.ledger.spreadsheet_id.trim().is_empty() {
            missing.push("ledger.spreadsheet_id".to_string());
        }
        if !self.ocr.tesseract.exists() {
            missing.push(format!(
                "ocr.tesseract (not found: {})",
                self.ocr.tesseract.display()
            ));
        }

        missing
    }

    /// Fail with `ConfigError::MissingRequired` unless every required key is set.
    pub fn ensure_required(&self) -> ConfigResult<()> {
        let missing = self.validate_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRequired(missing))
        }
    }

    /// Whether a notification channel is fully configured.
    #[must_use]
    pub fn notification_configured(&self) -> bool {
        !self.email.recipients().is_empty() && self.smtp.is_complete()
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("br", "paineel", "paineel").ok_or(ConfigError::NoConfigDir)
}

/// Batch execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock budget for the whole run, in seconds
    pub max_execution_secs: u64,
    /// Total rounds including the first pass
    pub max_retry_rounds: u32,
    /// Optional cap on the number of process numbers handled per run
    pub max_processes: Option<usize>,
    /// Captcha attempts per process number
    pub captcha_max_tries: u32,
    /// Wait after clicking search before reading results
    pub search_settle_ms: u64,
    /// Wait after opening a result before switching tabs
    pub result_settle_ms: u64,
    /// Wait after typing into the search field
    pub field_settle_ms: u64,
    /// Wait between captcha attempts
    pub reload_wait_ms: u64,
}

impl ExecutionConfig {
    #[must_use]
    pub fn max_execution(&self) -> Duration {
        Duration::from_secs(self.max_execution_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_execution_secs: 1800,
            max_retry_rounds: 3,
            max_processes: None,
            captcha_max_tries: 5,
            search_settle_ms: 5000,
            result_settle_ms: 2000,
            field_settle_ms: 300,
            reload_wait_ms: 3000,
        }
    }
}

/// Target application entry point and the element locators used on it.
///
/// Locators prefixed with `xpath:` are evaluated as XPath, everything else
/// as CSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub search_url: String,
    /// Ordered lookup strategies for the process number field
    pub process_field: Vec<String>,
    pub captcha_image: String,
    pub captcha_input: String,
    pub captcha_reload: String,
    pub search_button: String,
    pub result_links: String,
    /// Timeout for each locator lookup
    pub locate_timeout_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            search_url: "https://sei.aneel.gov.br/sei/modulos/pesquisa/\
                         md_pesq_processo_pesquisar.php?acao_externa=protocolo_pesquisar\
                         &acao_origem_externa=protocolo_pesquisar&id_orgao_acesso_externo=0"
                .to_string(),
            process_field: vec![
                "#txtProtocoloPesquisa".to_string(),
                "xpath://input[@name='txtProtocoloPesquisa']".to_string(),
                "xpath://input[contains(@placeholder, 'Processo')]".to_string(),
            ],
            captcha_image: "#imgCaptcha".to_string(),
            captcha_input: "#txtInfraCaptcha".to_string(),
            captcha_reload: "#imgRecaptcha".to_string(),
            search_button: "#sbmPesquisar".to_string(),
            result_links: "a".to_string(),
            locate_timeout_ms: 10_000,
        }
    }
}

/// Remote captcha solving service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// API key (prefer `PAINEEL_TWOCAPTCHA_KEY`)
    pub api_key: String,
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    /// Shortest answer accepted from either tier
    pub min_length: usize,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://2captcha.com".to_string(),
            poll_interval_secs: 5,
            timeout_secs: 120,
            min_length: 4,
        }
    }
}

/// Local OCR fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Path to the tesseract executable
    pub tesseract: PathBuf,
    /// Binarization threshold (pixels above become white)
    pub threshold: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("/usr/bin/tesseract"),
            threshold: 130,
        }
    }
}

/// Spreadsheet ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Service-account JSON key file
    pub credentials_file: Option<PathBuf>,
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub retry_attempts: u32,
    pub retry_initial_delay_secs: u64,
}

impl LedgerConfig {
    /// Retry policy applied to every ledger call.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.retry_attempts,
            Duration::from_secs(self.retry_initial_delay_secs),
        )
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credentials_file: None,
            spreadsheet_id: String::new(),
            worksheet: "Processos".to_string(),
            retry_attempts: 3,
            retry_initial_delay_secs: 2,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Chrome/Chromium executable; auto-detected when unset
    pub chrome_binary: Option<PathBuf>,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            chrome_binary: None,
            navigation_timeout_secs: 20,
        }
    }
}

/// SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub user: String,
    /// Prefer `PAINEEL_SMTP_PASSWORD`
    pub password: String,
    pub starttls: bool,
}

impl SmtpConfig {
    /// Server, user and password are all set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.server.trim().is_empty()
            && !self.user.trim().is_empty()
            && !self.password.is_empty()
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
            starttls: false,
        }
    }
}

/// Notification recipients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Trimmed, non-empty recipient addresses.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.recipients
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Data and scratch directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds `snapshot.json`
    pub data_dir: PathBuf,
    /// Holds temporary captcha images
    pub temp_dir: PathBuf,
}

impl PathsConfig {
    #[must_use]
    pub fn snapshot_file(&self) -> PathBuf {
        self.data_dir.join("snapshot.json")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let (data_dir, temp_dir) = match project_dirs() {
            Ok(dirs) => (dirs.data_dir().to_path_buf(), dirs.cache_dir().join("tmp")),
            Err(_) => (PathBuf::from("data"), PathBuf::from("temp")),
        };
        Self { data_dir, temp_dir }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
