//! Remote captcha solving service (2captcha HTTP API).

use crate::error::{CaptchaError, Result};
use async_trait::async_trait;
use base64::Engine;
use paineel_core::CaptchaConfig;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Answer the service gives while a worker is still on the image.
const NOT_READY: &str = "CAPCHA_NOT_READY";

/// A service that turns a captcha image into text.
#[async_trait]
pub trait RemoteSolver: Send + Sync {
    /// Solve a PNG-encoded challenge image.
    async fn solve(&self, png: &[u8]) -> Result<String>;

    /// Remaining account balance, used as a connectivity check.
    async fn balance(&self) -> Result<f64>;
}

/// 2captcha client using the `in.php` / `res.php` endpoints.
pub struct TwoCaptchaClient {
    client: Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: i64,
    request: serde_json::Value,
}

impl ApiResponse {
    fn text(&self) -> String {
        match &self.request {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Outcome of one poll against `res.php`.
#[derive(Debug, PartialEq, Eq)]
enum PollState {
    Ready(String),
    Pending,
}

fn parse_submit(body: &str) -> Result<String> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| CaptchaError::Service(format!("malformed submit response: {e}")))?;
    if response.status == 1 {
        Ok(response.text())
    } else {
        Err(CaptchaError::Service(response.text()))
    }
}

fn parse_poll(body: &str) -> Result<PollState> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| CaptchaError::Service(format!("malformed result response: {e}")))?;
    let text = response.text();
    match response.status {
        1 => Ok(PollState::Ready(text)),
        _ if text == NOT_READY => Ok(PollState::Pending),
        _ => Err(CaptchaError::Service(text)),
    }
}

fn parse_balance(body: &str) -> Result<f64> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| CaptchaError::Service(format!("malformed balance response: {e}")))?;
    let text = response.text();
    if response.status != 1 {
        return Err(CaptchaError::Service(text));
    }
    text.trim_matches('"')
        .parse()
        .map_err(|_| CaptchaError::Service(format!("unexpected balance '{text}'")))
}

impl TwoCaptchaClient {
    /// Create a client from the `[captcha]` configuration section.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &CaptchaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn submit(&self, png: &[u8]) -> Result<String> {
        let body = base64::engine::general_purpose::STANDARD.encode(png);
        let response = self
            .client
            .post(format!("{}/in.php", self.base_url))
            .form(&[
                ("key", self.api_key.as_str()),
                ("method", "base64"),
                ("body", body.as_str()),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_submit(&response)
    }

    async fn poll(&self, id: &str) -> Result<PollState> {
        let response = self
            .client
            .get(format!("{}/res.php", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("action", "get"),
                ("id", id),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_poll(&response)
    }
}

#[async_trait]
impl RemoteSolver for TwoCaptchaClient {
    async fn solve(&self, png: &[u8]) -> Result<String> {
        let id = self.submit(png).await?;
        debug!(id = %id, "captcha submitted");

        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match self.poll(&id).await? {
                PollState::Ready(text) => return Ok(text),
                PollState::Pending if started.elapsed() >= self.timeout => {
                    return Err(CaptchaError::Timeout(self.timeout.as_secs()));
                }
                PollState::Pending => {}
            }
        }
    }

    async fn balance(&self) -> Result<f64> {
        let response = self
            .client
            .get(format!("{}/res.php", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("action", "getbalance"),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_balance(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_ok() {
        let id = parse_submit(r#"{"status":1,"request":"2122988149"}"#).unwrap();
        assert_eq!(id, "2122988149");
    }

    #[test]
    fn test_parse_submit_error() {
        let err = parse_submit(r#"{"status":0,"request":"ERROR_WRONG_USER_KEY"}"#).unwrap_err();
        assert!(matches!(err, CaptchaError::Service(code) if code == "ERROR_WRONG_USER_KEY"));
    }

    #[test]
    fn test_parse_poll_states() {
        assert_eq!(
            parse_poll(r#"{"status":0,"request":"CAPCHA_NOT_READY"}"#).unwrap(),
            PollState::Pending
        );
        assert_eq!(
            parse_poll(r#"{"status":1,"request":"X7KQ"}"#).unwrap(),
            PollState::Ready("X7KQ".to_string())
        );
        assert!(parse_poll(r#"{"status":0,"request":"ERROR_CAPTCHA_UNSOLVABLE"}"#).is_err());
        assert!(parse_poll("<html>").is_err());
    }

    #[test]
    fn test_parse_balance() {
        let balance = parse_balance(r#"{"status":1,"request":"3.7412"}"#).unwrap();
        assert!((balance - 3.7412).abs() < 1e-9);
        assert!((parse_balance(r#"{"status":1,"request":12.5}"#).unwrap() - 12.5).abs() < 1e-9);
        assert!(parse_balance(r#"{"status":0,"request":"ERROR_KEY_DOES_NOT_EXIST"}"#).is_err());
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = CaptchaConfig {
            base_url: "https://2captcha.com/".to_string(),
            ..CaptchaConfig::default()
        };
        let client = TwoCaptchaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://2captcha.com");
    }
}
