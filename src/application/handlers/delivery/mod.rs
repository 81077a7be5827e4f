//! Delivery handlers: tokens, fulfillment email and resends.

mod fulfillment;
mod resend_links;
mod token_issuer;

pub use fulfillment::{DeliveryLink, DeliveryLinks, FulfillmentDispatcher, LinkBuilder};
pub use resend_links::{ResendLinksHandler, ResendSummary};
pub use token_issuer::{TokenIssuer, TokenPolicy};
