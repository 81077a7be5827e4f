//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - repositories and the row-locked order transition
//! - `memory` - the same repositories in memory, for tests and local runs
//! - `cinetpay` - provider reconcilers (live, dev stub, mock)
//! - `email` - Resend mailer, log-only and recording mailers
//! - `jobs` - document job queue on a tokio channel
//! - `auth` - bearer token validation
//! - `http` - axum routes

pub mod auth;
pub mod cinetpay;
pub mod email;
pub mod http;
pub mod jobs;
pub mod memory;
pub mod postgres;
