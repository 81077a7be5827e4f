//! In-memory adapters for tests and local runs without PostgreSQL.

mod store;

pub use store::{InMemoryLockedOrder, InMemoryStore};
