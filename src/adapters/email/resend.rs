//! Resend API mailer.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{EmailMessage, MailError, Mailer};

/// Retry delays in seconds (1s, then 4s).
const RETRY_DELAYS: &[u64] = &[1, 4];

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

#[derive(Clone)]
pub struct ResendMailer {
    api_key: SecretString,
    api_url: String,
    from: String,
    http_client: reqwest::Client,
}

impl ResendMailer {
    pub fn new(
        api_key: SecretString,
        api_url: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_key,
            api_url: api_url.into(),
            from: from.into(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// One request to Resend. Transient failures are `MailError::Transient`.
    async fn send_once(&self, request: &ResendEmailRequest<'_>) -> Result<String, MailError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                MailError::Transient(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let body: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse Resend API response");
                MailError::Rejected(format!("unreadable response: {}", e))
            })?;
            return Ok(body.id);
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 || status.is_server_error() {
            tracing::warn!(status = %status, body = %body, "Resend API returned transient error");
            Err(MailError::Transient(format!("{} - {}", status, body)))
        } else {
            tracing::error!(status = %status, body = %body, "Resend API returned non-transient error");
            Err(MailError::Rejected(format!("{} - {}", status, body)))
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let request = ResendEmailRequest {
            from: &self.from,
            to: vec![message.to.as_str()],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let mut last_error = None;
        for (attempt, delay_secs) in std::iter::once(&0u64).chain(RETRY_DELAYS).enumerate() {
            if *delay_secs > 0 {
                tracing::warn!(attempt, delay_secs, "Retrying email send after transient failure");
                tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
            }

            match self.send_once(&request).await {
                Ok(id) => {
                    tracing::info!(to = %message.to, email_id = %id, attempt, "Email sent via Resend");
                    return Ok(());
                }
                Err(MailError::Transient(reason)) => last_error = Some(MailError::Transient(reason)),
                Err(other) => return Err(other),
            }
        }

        tracing::error!(
            to = %message.to,
            attempts = RETRY_DELAYS.len() + 1,
            "Email send failed after all retries"
        );
        Err(last_error.unwrap_or_else(|| MailError::Transient("all retries exhausted".into())))
    }
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("api_url", &self.api_url)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_single_recipient() {
        let request = ResendEmailRequest {
            from: "Boutique <commandes@example.com>",
            to: vec!["buyer@example.com"],
            subject: "Votre commande",
            text: "t",
            html: "<p>h</p>",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"][0], "buyer@example.com");
        assert_eq!(json["from"], "Boutique <commandes@example.com>");
    }

    #[test]
    fn debug_hides_api_key() {
        let mailer = ResendMailer::new(
            SecretString::new("re_secret_value".into()),
            "https://api.resend.com/emails",
            "Boutique <commandes@example.com>",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{:?}", mailer).contains("re_secret_value"));
    }
}
