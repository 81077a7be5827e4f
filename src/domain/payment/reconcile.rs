//! Provider-side payment verdicts.

use thiserror::Error;

/// Authoritative answer from the provider's transaction check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileVerdict {
    pub is_paid: bool,
    pub provider_transaction_id: Option<String>,
}

impl ReconcileVerdict {
    pub fn paid(provider_transaction_id: impl Into<String>) -> Self {
        Self {
            is_paid: true,
            provider_transaction_id: Some(provider_transaction_id.into()),
        }
    }

    pub fn not_paid() -> Self {
        Self {
            is_paid: false,
            provider_transaction_id: None,
        }
    }
}

/// The check could not produce a verdict. Never read as "not paid".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("provider check timed out")]
    Timeout,

    #[error("provider unreachable: {0}")]
    Network(String),

    #[error("provider answered HTTP {0}")]
    HttpStatus(u16),

    #[error("provider response unreadable: {0}")]
    InvalidResponse(String),
}

impl ReconcileError {
    /// Whether a later attempt (redelivery or sweep) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Timeout | ReconcileError::Network(_) => true,
            ReconcileError::HttpStatus(code) => *code == 429 || *code >= 500,
            ReconcileError::InvalidResponse(_) => false,
        }
    }
}
