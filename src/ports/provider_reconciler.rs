//! ProviderReconciler port - authoritative payment check against the provider.
//!
//! Read-only and safe to call repeatedly. A failed call is an error, never a
//! "not paid" verdict.

use async_trait::async_trait;

use crate::domain::payment::{ReconcileError, ReconcileVerdict};

#[async_trait]
pub trait ProviderReconciler: Send + Sync {
    async fn check(&self, external_ref: &str) -> Result<ReconcileVerdict, ReconcileError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}
