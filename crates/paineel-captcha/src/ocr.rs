//! Local OCR fallback through the tesseract command-line tool.

use crate::error::{CaptchaError, Result};
use crate::preprocess;
use async_trait::async_trait;
use paineel_core::OcrConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Characters the OCR engine is allowed to emit.
pub const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Reads text out of a challenge image stored on disk.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Raw recognised text (not yet filtered).
    async fn recognize(&self, image_path: &Path) -> Result<String>;
}

/// Runs the tesseract binary on a preprocessed copy of the image.
pub struct TesseractOcr {
    binary: PathBuf,
    threshold: u8,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract.clone(),
            threshold: config.threshold,
        }
    }

    /// Path of the cleaned-up image written next to the original.
    fn prepared_path(image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("captcha");
        image_path.with_file_name(format!("{stem}_ocr.png"))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image_path: &Path) -> Result<String> {
        let source = image_path.to_path_buf();
        let prepared = Self::prepared_path(image_path);
        let threshold = self.threshold;

        let target = prepared.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let img = image::open(&source)?;
            preprocess::prepare(&img, threshold).save(&target)?;
            Ok(())
        })
        .await
        .map_err(|e| CaptchaError::Ocr(format!("preprocessing task failed: {e}")))??;

        let output = Command::new(&self.binary)
            .arg(&prepared)
            .arg("stdout")
            .args(["--psm", "8", "-c"])
            .arg(format!("tessedit_char_whitelist={CHAR_WHITELIST}"))
            .output()
            .await
            .map_err(|e| {
                CaptchaError::Ocr(format!("cannot run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(CaptchaError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(text = %text, "tesseract output");
        Ok(text)
    }
}
