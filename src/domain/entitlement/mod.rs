//! Entitlements: who may see which protected content category.

mod catalog;
mod entitlement;
mod errors;
mod viewer;

pub use catalog::{Catalog, CatalogError, DocumentVariant, Product, ProtectedCategory};
pub use entitlement::{Entitlement, EntitlementSource};
pub use errors::EntitlementError;
pub use viewer::{
    requires_entitlement, AccessDecision, AllowReason, DenyReason, ViewerContext, ViewerIdentity,
};
