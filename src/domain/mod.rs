//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, HMAC helpers)
//! - `payment` - Orders, notifications, signature verification, ledger entries
//! - `delivery` - Download tokens, signed file URLs, bonus links
//! - `entitlement` - Catalog, entitlement grants, viewer identity and policy

pub mod delivery;
pub mod entitlement;
pub mod foundation;
pub mod payment;
