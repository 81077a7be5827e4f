//! Mock reconciler for testing.
//!
//! Returns a configured verdict (or error) per reference, falls back to a
//! default, and records every call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::payment::{ReconcileError, ReconcileVerdict};
use crate::ports::ProviderReconciler;

type Scripted = Result<ReconcileVerdict, ReconcileError>;

#[derive(Default)]
struct MockState {
    by_ref: HashMap<String, Scripted>,
    default: Option<Scripted>,
    calls: Vec<String>,
}

/// Scripted reconciler.
///
/// # Example
///
/// ```ignore
/// let mock = MockReconciler::paying();
/// mock.set_error("TXN-2", ReconcileError::Timeout);
/// assert_eq!(mock.calls(), vec!["TXN-1"]);
/// ```
#[derive(Clone, Default)]
pub struct MockReconciler {
    inner: Arc<Mutex<MockState>>,
}

impl MockReconciler {
    /// Reports not paid for every reference until configured otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports every reference as paid.
    pub fn paying() -> Self {
        let mock = Self::new();
        mock.set_default(Ok(ReconcileVerdict::paid("PROV-1")));
        mock
    }

    pub fn set_default(&self, result: Scripted) {
        self.lock().default = Some(result);
    }

    pub fn set_verdict(&self, external_ref: &str, verdict: ReconcileVerdict) {
        self.lock().by_ref.insert(external_ref.to_string(), Ok(verdict));
    }

    pub fn set_error(&self, external_ref: &str, error: ReconcileError) {
        self.lock().by_ref.insert(external_ref.to_string(), Err(error));
    }

    /// References checked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProviderReconciler for MockReconciler {
    async fn check(&self, external_ref: &str) -> Result<ReconcileVerdict, ReconcileError> {
        let mut state = self.lock();
        state.calls.push(external_ref.to_string());
        state
            .by_ref
            .get(external_ref)
            .or(state.default.as_ref())
            .cloned()
            .unwrap_or_else(|| Ok(ReconcileVerdict::not_paid()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
