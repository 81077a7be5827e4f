//! Mailer port - outbound transactional email.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    /// Worth retrying later (timeouts, 429, 5xx).
    #[error("mail transport unavailable: {0}")]
    Transient(String),

    /// The transport refused the message.
    #[error("mail rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}
