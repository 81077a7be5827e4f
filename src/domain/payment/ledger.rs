//! Webhook ledger entries: one per inbound notification attempt.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{LedgerEntryId, Timestamp};

use super::notification::Provider;

/// Stored signature material is cut to this many characters.
const MAX_SIGNATURE_CHARS: usize = 512;

/// What happened to a recorded notification. Written once, after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOutcome {
    /// Order moved to PAID by this notification.
    Processed,
    /// Order was already terminal; nothing happened.
    Idempotent,
    /// Provider says not paid; order moved to FAILED.
    NotPaid,
    /// Reference does not match any order.
    UnknownOrder,
    /// Provider check errored; order left as it was.
    CheckFailed,
    /// Storage failed mid-transition; answered 500 so the provider redelivers.
    Failed,
    RejectedSignature,
    Malformed,
}

impl LedgerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOutcome::Processed => "processed",
            LedgerOutcome::Idempotent => "idempotent",
            LedgerOutcome::NotPaid => "not_paid",
            LedgerOutcome::UnknownOrder => "unknown_order",
            LedgerOutcome::CheckFailed => "check_failed",
            LedgerOutcome::Failed => "failed",
            LedgerOutcome::RejectedSignature => "rejected_signature",
            LedgerOutcome::Malformed => "malformed",
        }
    }

    /// HTTP status answered to the provider.
    ///
    /// Only notifications that can never become valid get a 4xx; everything
    /// else is acknowledged so the provider stops redelivering.
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerOutcome::RejectedSignature | LedgerOutcome::Malformed => 400,
            LedgerOutcome::Failed => 500,
            _ => 200,
        }
    }
}

impl fmt::Display for LedgerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(LedgerOutcome::Processed),
            "idempotent" => Ok(LedgerOutcome::Idempotent),
            "not_paid" => Ok(LedgerOutcome::NotPaid),
            "unknown_order" => Ok(LedgerOutcome::UnknownOrder),
            "check_failed" => Ok(LedgerOutcome::CheckFailed),
            "failed" => Ok(LedgerOutcome::Failed),
            "rejected_signature" => Ok(LedgerOutcome::RejectedSignature),
            "malformed" => Ok(LedgerOutcome::Malformed),
            other => Err(format!("unknown ledger outcome: {}", other)),
        }
    }
}

/// A notification attempt about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub provider: Provider,
    pub claimed_ref: Option<String>,
    pub claimed_status: Option<String>,
    pub signature: Option<String>,
    pub raw_body: Vec<u8>,
    pub verified: bool,
    pub received_at: Timestamp,
}

impl NewLedgerEntry {
    pub fn new(
        provider: Provider,
        claimed_ref: Option<String>,
        claimed_status: Option<String>,
        signature: Option<String>,
        raw_body: Vec<u8>,
        verified: bool,
    ) -> Self {
        Self {
            provider,
            claimed_ref,
            claimed_status,
            signature: signature.map(|s| s.chars().take(MAX_SIGNATURE_CHARS).collect()),
            raw_body,
            verified,
            received_at: Timestamp::now(),
        }
    }
}

/// A recorded notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub provider: Provider,
    pub claimed_ref: Option<String>,
    pub claimed_status: Option<String>,
    pub signature: Option<String>,
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub verified: bool,
    pub outcome: Option<LedgerOutcome>,
    pub http_status: Option<u16>,
    pub received_at: Timestamp,
}

impl LedgerEntry {
    pub fn from_new(id: LedgerEntryId, entry: NewLedgerEntry) -> Self {
        Self {
            id,
            provider: entry.provider,
            claimed_ref: entry.claimed_ref,
            claimed_status: entry.claimed_status,
            signature: entry.signature,
            raw_body: entry.raw_body,
            verified: entry.verified,
            outcome: None,
            http_status: None,
            received_at: entry.received_at,
        }
    }
}
