use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("SMTP not configured: {0}")]
    NotConfigured(String),

    #[error("no recipients")]
    NoRecipients,
}

pub type Result<T> = std::result::Result<T, MailError>;
