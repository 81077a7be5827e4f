//! Mailer that only logs.

use async_trait::async_trait;

use crate::ports::{EmailMessage, MailError, Mailer};

#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Email not sent (no transport configured)"
        );
        Ok(())
    }
}
