//! [`Notifier`] that mails the HTML report.

use crate::report::render;
use crate::sender::SmtpMailer;
use async_trait::async_trait;
use paineel_core::{AppConfig, SmtpConfig};
use paineel_monitor::{MonitorError, Notification, Notifier};
use tracing::warn;

pub struct SmtpNotifier {
    smtp: SmtpConfig,
    recipients: Vec<String>,
}

impl SmtpNotifier {
    pub fn new(smtp: SmtpConfig, recipients: Vec<String>) -> Self {
        Self { smtp, recipients }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.smtp.clone(), config.email.recipients())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    /// Missing SMTP settings or recipients skip sending with a warning.
    async fn notify(&self, notification: &Notification) -> Result<(), MonitorError> {
        if !self.smtp.is_complete() {
            warn!("SMTP settings incomplete, report not sent");
            return Ok(());
        }
        if self.recipients.is_empty() {
            warn!("no recipients configured, report not sent");
            return Ok(());
        }

        let mailer =
            SmtpMailer::new(&self.smtp).map_err(|e| MonitorError::Notification(e.to_string()))?;
        mailer
            .send_html(&self.recipients, &notification.subject, render(notification))
            .await
            .map_err(|e| MonitorError::Notification(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_notifier_skips_quietly() {
        let notifier = SmtpNotifier::from_config(&AppConfig::default());
        let notification = Notification::new(Vec::new(), vec!["12345".to_string()]);
        assert!(notifier.notify(&notification).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_recipients_skip_quietly() {
        let smtp = SmtpConfig {
            server: "smtp.example.com".to_string(),
            user: "monitor@example.com".to_string(),
            password: "secret".to_string(),
            ..SmtpConfig::default()
        };
        let notifier = SmtpNotifier::new(smtp, Vec::new());
        let notification = Notification::new(Vec::new(), vec!["12345".to_string()]);
        assert!(notifier.notify(&notification).await.is_ok());
    }
}
