//! SMTP delivery through lettre's async transport.

use crate::error::{MailError, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use paineel_core::SmtpConfig;
use tracing::{debug, info};

/// Implicit-TLS submission port.
const SMTPS_PORT: u16 = 465;

/// Authenticated SMTP sender; the configured user is also the `From` address.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. STARTTLS when configured, implicit TLS on port
    /// 465, plain otherwise.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if !config.is_complete() {
            return Err(MailError::NotConfigured(
                "server, user and password are required".to_string(),
            ));
        }
        let from: Mailbox = config.user.trim().parse()?;
        let server = config.server.trim();

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)?
        } else if config.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.user.trim().to_string(),
                config.password.clone(),
            ))
            .build();

        debug!(server, port = config.port, starttls = config.starttls, "SMTP transport ready");
        Ok(Self { transport, from })
    }

    /// Send an HTML message to every recipient.
    pub async fn send_html(
        &self,
        recipients: &[String],
        subject: &str,
        html: String,
    ) -> Result<()> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient.parse()?);
        }
        let message = builder.header(ContentType::TEXT_HTML).body(html)?;

        self.transport.send(message).await?;
        info!(recipients = recipients.len(), "report sent");
        Ok(())
    }

    /// Connect and authenticate without sending anything.
    pub async fn test_connection(&self) -> Result<bool> {
        Ok(self.transport.test_connection().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(port: u16, starttls: bool) -> SmtpConfig {
        SmtpConfig {
            server: "smtp.example.com".to_string(),
            port,
            user: "monitor@example.com".to_string(),
            password: "secret".to_string(),
            starttls,
        }
    }

    #[tokio::test]
    async fn test_incomplete_config_is_rejected() {
        let err = SmtpMailer::new(&SmtpConfig::default()).err().unwrap();
        assert!(matches!(err, MailError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_bad_sender_address_is_rejected() {
        let mut config = smtp(587, false);
        config.user = "not an address".to_string();
        assert!(matches!(
            SmtpMailer::new(&config).err().unwrap(),
            MailError::Address(_)
        ));
    }

    #[tokio::test]
    async fn test_transport_variants_build() {
        assert!(SmtpMailer::new(&smtp(587, false)).is_ok());
        assert!(SmtpMailer::new(&smtp(587, true)).is_ok());
        assert!(SmtpMailer::new(&smtp(465, false)).is_ok());
    }

    #[tokio::test]
    async fn test_send_requires_recipients() {
        let mailer = SmtpMailer::new(&smtp(587, false)).unwrap();
        let err = mailer.send_html(&[], "s", String::new()).await.unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }
}
