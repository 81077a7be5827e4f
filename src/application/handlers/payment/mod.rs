//! Payment handlers: checkout, webhooks, the locked transition and the sweep.

mod create_order;
mod handle_webhook;
mod post_payment;
mod reconcile_stale;
mod transition_payment;

pub use create_order::{CreateOrderCommand, CreateOrderHandler};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, HandleWebhookResult};
pub use post_payment::PostPaymentActions;
pub use reconcile_stale::{ReconcileStaleCommand, ReconcileStaleHandler, SweepSummary, SWEEP_CLAIM};
pub use transition_payment::{TransitionOutcome, TransitionPaymentCommand, TransitionPaymentHandler};
