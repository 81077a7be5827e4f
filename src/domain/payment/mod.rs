//! Payment confirmation: orders, notifications, signatures and the ledger.

mod errors;
mod ledger;
mod notification;
mod order;
mod reconcile;
mod signature;
mod status;

pub use errors::PaymentError;
pub use ledger::{LedgerEntry, LedgerOutcome, NewLedgerEntry};
pub use notification::{Claims, Notification, NotificationError, Provider};
pub use order::{generate_external_ref, AmountCheck, Order};
pub use reconcile::{ReconcileError, ReconcileVerdict};
pub use signature::SignatureVerifier;
pub use status::OrderStatus;
