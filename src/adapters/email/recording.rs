//! Recording mailer for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ports::{EmailMessage, MailError, Mailer};

#[derive(Default)]
struct RecordingState {
    sent: Vec<EmailMessage>,
    failure: Option<MailError>,
    delay: Option<Duration>,
}

/// Captures sent messages; can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    inner: Arc<Mutex<RecordingState>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send fails with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<MailError>) {
        self.lock().failure = error;
    }

    /// Every later send sleeps for `delay` before it is recorded.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.lock().sent.clone()
    }

    pub fn sent_to(&self, email: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == email).collect()
    }

    /// Polls until at least `count` messages were sent or five seconds pass,
    /// then returns whatever was recorded.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<EmailMessage> {
        for _ in 0..500 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state.sent.push(message.clone());
        Ok(())
    }
}
