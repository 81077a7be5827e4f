//! Paygate - payment confirmation and fulfillment for a digital document store.
//!
//! Inbound provider notifications are authenticated, logged to an append-only
//! ledger and re-checked with the provider before an order moves to PAID.
//! A paid order gets a download token, entitlements for the content it
//! unlocks and a best-effort fulfillment email.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
