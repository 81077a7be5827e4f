//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresOrderRepository` - orders and the row-locked transition
//! - `PostgresWebhookLedger` - append-only notification ledger
//! - `PostgresDownloadTokenRepository` - read and consumable tokens
//! - `PostgresEntitlementRepository` - category grants

mod download_token_repository;
mod entitlement_repository;
mod order_repository;
mod webhook_ledger;

pub use download_token_repository::PostgresDownloadTokenRepository;
pub use entitlement_repository::PostgresEntitlementRepository;
pub use order_repository::{PostgresLockedOrder, PostgresOrderRepository};
pub use webhook_ledger::PostgresWebhookLedger;

use crate::domain::foundation::DomainError;

/// Maps a sqlx error to a database `DomainError` with context.
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| DomainError::database(format!("{}: {}", context, e))
}
