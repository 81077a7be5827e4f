//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod delivery;
pub mod entitlement;
pub mod payment;

pub use delivery::{
    DeliveryLink, DeliveryLinks, FulfillmentDispatcher, LinkBuilder, ResendLinksHandler,
    ResendSummary, TokenIssuer, TokenPolicy,
};
pub use entitlement::{ClaimEntitlementCommand, ClaimEntitlementHandler, ClaimOutcome, EntitlementGate};
pub use payment::{
    CreateOrderCommand, CreateOrderHandler, HandleWebhookCommand, HandleWebhookHandler,
    HandleWebhookResult, PostPaymentActions, ReconcileStaleCommand, ReconcileStaleHandler,
    SweepSummary, TransitionOutcome, TransitionPaymentCommand, TransitionPaymentHandler,
};
