//! Two-tier captcha resolution driven through the browser.

use crate::error::{CaptchaError, Result};
use crate::ocr::OcrEngine;
use crate::remote::RemoteSolver;
use paineel_browser::{BrowserActions, Locator};
use paineel_core::{retry_with_backoff, AppConfig, RetryPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name prefix of the per-attempt challenge images.
const IMAGE_PREFIX: &str = "captcha_";

/// Resolver settings, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub image: Locator,
    pub reload: Locator,
    pub temp_dir: PathBuf,
    pub max_tries: u32,
    pub reload_wait: Duration,
    pub min_length: usize,
    pub locate_timeout: Duration,
}

impl ResolverSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image: Locator::parse(&config.target.captcha_image),
            reload: Locator::parse(&config.target.captcha_reload),
            temp_dir: config.paths.temp_dir.clone(),
            max_tries: config.execution.captcha_max_tries,
            reload_wait: Duration::from_millis(config.execution.reload_wait_ms),
            min_length: config.captcha.min_length,
            locate_timeout: Duration::from_millis(config.target.locate_timeout_ms),
        }
    }
}

/// Turns the challenge currently on screen into text.
///
/// Each attempt screenshots the challenge, asks the remote service first and
/// falls back to local OCR. A failed attempt reloads the challenge before the
/// next one.
pub struct CaptchaResolver {
    remote: Box<dyn RemoteSolver>,
    ocr: Box<dyn OcrEngine>,
    settings: ResolverSettings,
}

/// Remote answers are taken as-is once trimmed.
fn accept_remote(text: &str, min_length: usize) -> Result<String> {
    let answer = text.trim();
    if answer.chars().count() >= min_length {
        Ok(answer.to_string())
    } else {
        Err(CaptchaError::Rejected {
            answer: answer.to_string(),
            min_length,
        })
    }
}

/// OCR output keeps alphanumerics only.
fn accept_ocr(text: &str, min_length: usize) -> Result<String> {
    let cleaned: String = text.chars().filter(|c| c.is_alphanumeric()).collect();
    if cleaned.chars().count() >= min_length {
        Ok(cleaned)
    } else {
        Err(CaptchaError::Rejected {
            answer: cleaned,
            min_length,
        })
    }
}

impl CaptchaResolver {
    pub fn new(
        remote: Box<dyn RemoteSolver>,
        ocr: Box<dyn OcrEngine>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            remote,
            ocr,
            settings,
        }
    }

    /// Resolve the challenge on the active page.
    ///
    /// Returns an empty string once every attempt has failed; callers treat
    /// that as a terminal failure for the current process number.
    pub async fn resolve(&self, browser: &dyn BrowserActions) -> String {
        let policy = RetryPolicy::fixed(self.settings.max_tries, self.settings.reload_wait);
        match retry_with_backoff(&policy, "captcha", |attempt| self.attempt(browser, attempt))
            .await
        {
            Ok(text) => text,
            Err(_) => {
                warn!(
                    tries = self.settings.max_tries,
                    "could not resolve captcha"
                );
                String::new()
            }
        }
    }

    async fn attempt(&self, browser: &dyn BrowserActions, attempt: u32) -> Result<String> {
        info!(
            attempt,
            max = self.settings.max_tries,
            "resolving captcha"
        );

        let outcome = self.solve_once(browser, attempt).await;
        if outcome.is_err() {
            self.reload(browser).await;
        }
        outcome
    }

    async fn solve_once(&self, browser: &dyn BrowserActions, attempt: u32) -> Result<String> {
        browser
            .wait_for(&self.settings.image, self.settings.locate_timeout)
            .await?;
        let png = browser.screenshot_element(&self.settings.image).await?;
        let image_path = self.image_path(attempt);
        tokio::fs::create_dir_all(&self.settings.temp_dir).await?;
        tokio::fs::write(&image_path, &png).await?;

        match self
            .remote
            .solve(&png)
            .await
            .and_then(|text| accept_remote(&text, self.settings.min_length))
        {
            Ok(text) => {
                info!(answer = %text, "captcha solved by remote service");
                return Ok(text);
            }
            Err(e) => warn!("remote captcha service failed: {e}; trying local OCR"),
        }

        let text = self
            .ocr
            .recognize(&image_path)
            .await
            .and_then(|raw| accept_ocr(&raw, self.settings.min_length))?;
        info!(answer = %text, "captcha solved by local OCR");
        Ok(text)
    }

    /// Click the reload control when the page offers one.
    async fn reload(&self, browser: &dyn BrowserActions) {
        match browser.exists(&self.settings.reload).await {
            Ok(true) => {
                if let Err(e) = browser.click(&self.settings.reload).await {
                    debug!("captcha reload click failed: {e}");
                } else {
                    debug!("captcha reloaded");
                }
            }
            _ => debug!("no captcha reload control, waiting instead"),
        }
    }

    fn image_path(&self, attempt: u32) -> PathBuf {
        self.settings
            .temp_dir
            .join(format!("{IMAGE_PREFIX}{attempt}.png"))
    }

    /// Remove every `captcha_*.png` left in the temp directory.
    ///
    /// Returns how many files were deleted.
    pub fn purge(&self) -> usize {
        purge_dir(&self.settings.temp_dir)
    }
}

fn purge_dir(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(IMAGE_PREFIX) && name.ends_with(".png") {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("could not remove {}: {}", entry.path().display(), e),
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_remote_trims_and_checks_length() {
        assert_eq!(accept_remote(" x7kq \n", 4).unwrap(), "x7kq");
        assert!(accept_remote("ab", 4).is_err());
        assert!(accept_remote("", 4).is_err());
    }

    #[test]
    fn test_accept_ocr_filters_non_alphanumerics() {
        assert_eq!(accept_ocr("A B-7\n9", 4).unwrap(), "AB79");
        assert!(accept_ocr("A-B.", 4).is_err());
    }

    #[test]
    fn test_purge_only_removes_challenge_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["captcha_1.png", "captcha_2_ocr.png", "keep.png", "captcha_1.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        assert_eq!(purge_dir(dir.path()), 2);
        assert!(dir.path().join("keep.png").exists());
        assert!(dir.path().join("captcha_1.txt").exists());
        assert!(!dir.path().join("captcha_1.png").exists());
    }

    #[test]
    fn test_purge_missing_dir_is_noop() {
        assert_eq!(purge_dir(Path::new("/definitely/not/here")), 0);
    }
}
