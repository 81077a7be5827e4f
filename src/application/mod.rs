//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers hold their ports as `Arc<dyn Port>` and are wired once at start-up.

pub mod handlers;

pub use handlers::{
    // Payment
    CreateOrderCommand, CreateOrderHandler, HandleWebhookCommand, HandleWebhookHandler,
    HandleWebhookResult, PostPaymentActions, ReconcileStaleCommand, ReconcileStaleHandler,
    SweepSummary, TransitionOutcome, TransitionPaymentCommand, TransitionPaymentHandler,
    // Delivery
    FulfillmentDispatcher, LinkBuilder, ResendLinksHandler, TokenIssuer, TokenPolicy,
    // Entitlement
    ClaimEntitlementCommand, ClaimEntitlementHandler, ClaimOutcome, EntitlementGate,
};
