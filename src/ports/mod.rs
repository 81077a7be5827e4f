//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage
//!
//! - `OrderRepository` / `LockedOrder` - orders and the serialized transition
//! - `WebhookLedger` - append-only notification log
//! - `DownloadTokenRepository` - read and consumable tokens
//! - `EntitlementRepository` - category grants
//!
//! ## Outbound
//!
//! - `ProviderReconciler` - server-to-server payment check
//! - `Mailer` - transactional email
//! - `DocumentJobQueue` - fire-and-forget document generation
//!
//! ## Identity
//!
//! - `SessionValidator` - bearer token validation

mod document_job_queue;
mod download_token_repository;
mod entitlement_repository;
mod mailer;
mod order_repository;
mod provider_reconciler;
mod session_validator;
mod webhook_ledger;

pub use document_job_queue::{DocumentJob, DocumentJobQueue};
pub use download_token_repository::DownloadTokenRepository;
pub use entitlement_repository::EntitlementRepository;
pub use mailer::{EmailMessage, MailError, Mailer};
pub use order_repository::{LockedOrder, OrderChanges, OrderRepository};
pub use provider_reconciler::ProviderReconciler;
pub use session_validator::SessionValidator;
pub use webhook_ledger::WebhookLedger;
