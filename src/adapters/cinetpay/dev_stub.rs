//! Development reconciler that confirms every payment.
//!
//! Only constructed when no provider credentials are configured, the stub is
//! explicitly allowed, and the environment is not production.

use async_trait::async_trait;

use crate::domain::payment::{ReconcileError, ReconcileVerdict};
use crate::ports::ProviderReconciler;

#[derive(Debug, Default, Clone)]
pub struct DevStubReconciler;

impl DevStubReconciler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderReconciler for DevStubReconciler {
    async fn check(&self, external_ref: &str) -> Result<ReconcileVerdict, ReconcileError> {
        tracing::warn!(external_ref = %external_ref, "Dev stub confirming payment without provider check");
        Ok(ReconcileVerdict::paid(format!("DEV-{}", external_ref)))
    }

    fn name(&self) -> &'static str {
        "dev-stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_confirms_with_prefixed_id() {
        let verdict = DevStubReconciler::new().check("TXN-1").await.unwrap();
        assert_eq!(verdict, ReconcileVerdict::paid("DEV-TXN-1"));
    }
}
