//! Entitlement handlers: the access gate and the claim flow.

mod claim_entitlement;
mod entitlement_gate;

pub use claim_entitlement::{ClaimEntitlementCommand, ClaimEntitlementHandler, ClaimOutcome};
pub use entitlement_gate::EntitlementGate;
