//! WebhookLedger port - append-only record of every inbound notification.
//!
//! An entry is written before any business effect, whether or not the
//! signature verified. The only later write is the outcome, set once.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, LedgerEntryId};
use crate::domain::payment::{LedgerEntry, LedgerOutcome, NewLedgerEntry};

#[async_trait]
pub trait WebhookLedger: Send + Sync {
    /// Persists the attempt and returns its id.
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntryId, DomainError>;

    /// Stores the processing outcome. A second call for the same entry is ignored.
    async fn record_outcome(
        &self,
        id: &LedgerEntryId,
        outcome: LedgerOutcome,
    ) -> Result<(), DomainError>;

    /// Entries claiming this reference, oldest first.
    async fn entries_for_ref(&self, claimed_ref: &str) -> Result<Vec<LedgerEntry>, DomainError>;
}
