//! Provider reconciler adapters.
//!
//! - `CinetPayReconciler` - live server-to-server transaction check
//! - `DevStubReconciler` - always-paid stand-in for local development
//! - `MockReconciler` - scripted verdicts for tests

mod dev_stub;
mod live;
mod mock;

pub use dev_stub::DevStubReconciler;
pub use live::CinetPayReconciler;
pub use mock::MockReconciler;

use std::sync::Arc;

use crate::config::{Environment, PaymentConfig, ReconcilerMode, ValidationError};
use crate::ports::ProviderReconciler;

/// Picks the reconciler the configuration allows.
///
/// Live when credentials are set; the dev stub only when explicitly allowed
/// outside production.
pub fn reconciler_from_config(
    config: &PaymentConfig,
    environment: Environment,
) -> Result<Arc<dyn ProviderReconciler>, ValidationError> {
    match config.reconciler_mode(environment)? {
        ReconcilerMode::Live => {
            let (api_key, site_id) = config
                .credentials()
                .ok_or(ValidationError::PartialProviderCredentials)?;
            let reconciler = CinetPayReconciler::new(
                api_key.clone(),
                site_id,
                config.check_url.clone(),
                config.check_timeout(),
            )
            .map_err(|_| ValidationError::InvalidCheckTimeout)?;
            Ok(Arc::new(reconciler))
        }
        ReconcilerMode::DevStub => {
            tracing::warn!("No provider credentials; payments are confirmed by the dev stub");
            Ok(Arc::new(DevStubReconciler::new()))
        }
    }
}
