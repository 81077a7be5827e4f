//! Mailer adapters.
//!
//! - `ResendMailer` - Resend HTTP API with retries on transient failures
//! - `LogMailer` - logs instead of sending (no API key configured)
//! - `RecordingMailer` - captures messages for tests

mod log_mailer;
mod recording;
mod resend;

pub use log_mailer::LogMailer;
pub use recording::RecordingMailer;
pub use resend::ResendMailer;

use std::sync::Arc;

use crate::config::EmailConfig;
use crate::ports::Mailer;

/// Resend when an API key is configured, otherwise log-only.
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, reqwest::Error> {
    match config.api_key() {
        Some(api_key) => Ok(Arc::new(ResendMailer::new(
            api_key.clone(),
            config.api_url.clone(),
            config.from_header(),
            config.request_timeout(),
        )?)),
        None => {
            tracing::warn!("No Resend API key configured, emails will only be logged");
            Ok(Arc::new(LogMailer::new()))
        }
    }
}
