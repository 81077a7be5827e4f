//! PostgreSQL implementation of WebhookLedger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, LedgerEntryId, Timestamp};
use crate::domain::payment::{LedgerEntry, LedgerOutcome, NewLedgerEntry, Provider};
use crate::ports::WebhookLedger;

use super::db_error;

pub struct PostgresWebhookLedger {
    pool: PgPool,
}

impl PostgresWebhookLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    provider: String,
    claimed_ref: Option<String>,
    claimed_status: Option<String>,
    signature: Option<String>,
    raw_body: Vec<u8>,
    verified: bool,
    outcome: Option<String>,
    http_status: Option<i32>,
    received_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let provider: Provider = row
            .provider
            .parse()
            .map_err(|e: String| DomainError::database(e))?;
        let outcome = row
            .outcome
            .map(|o| o.parse::<LedgerOutcome>())
            .transpose()
            .map_err(DomainError::database)?;

        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(row.id),
            provider,
            claimed_ref: row.claimed_ref,
            claimed_status: row.claimed_status,
            signature: row.signature,
            raw_body: row.raw_body,
            verified: row.verified,
            outcome,
            http_status: row.http_status.and_then(|s| u16::try_from(s).ok()),
            received_at: Timestamp::from_datetime(row.received_at),
        })
    }
}

#[async_trait]
impl WebhookLedger for PostgresWebhookLedger {
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntryId, DomainError> {
        let id = LedgerEntryId::new();
        sqlx::query(
            r#"
            INSERT INTO webhook_ledger (
                id, provider, claimed_ref, claimed_status, signature, raw_body,
                verified, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id.as_uuid())
        .bind(entry.provider.as_str())
        .bind(&entry.claimed_ref)
        .bind(&entry.claimed_status)
        .bind(&entry.signature)
        .bind(&entry.raw_body)
        .bind(entry.verified)
        .bind(entry.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record webhook"))?;

        Ok(id)
    }

    async fn record_outcome(
        &self,
        id: &LedgerEntryId,
        outcome: LedgerOutcome,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE webhook_ledger SET outcome = $2, http_status = $3
            WHERE id = $1 AND outcome IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(outcome.as_str())
        .bind(i32::from(outcome.http_status()))
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record webhook outcome"))?;

        Ok(())
    }

    async fn entries_for_ref(&self, claimed_ref: &str) -> Result<Vec<LedgerEntry>, DomainError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, provider, claimed_ref, claimed_status, signature, raw_body,
                   verified, outcome, http_status, received_at
            FROM webhook_ledger
            WHERE claimed_ref = $1
            ORDER BY received_at ASC
            "#,
        )
        .bind(claimed_ref)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list webhook entries"))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
