//! OrderRepository port - storage for orders and the locked transition.
//!
//! The state transition reads and writes an order under an exclusive lock so
//! two deliveries of the same notification serialize. Adapters express the
//! lock however their store allows (row lock, per-key mutex); callers only
//! see `LockedOrder`.

use async_trait::async_trait;

use crate::domain::delivery::DownloadToken;
use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::payment::Order;

/// Everything written together when a locked transition commits.
#[derive(Debug, Clone)]
pub struct OrderChanges {
    pub order: Order,
    pub token: Option<DownloadToken>,
    pub entitlements: Vec<Entitlement>,
}

impl OrderChanges {
    pub fn status_only(order: Order) -> Self {
        Self {
            order,
            token: None,
            entitlements: Vec::new(),
        }
    }
}

/// An order held under an exclusive lock until committed or released.
///
/// Dropping it without calling either releases the lock and writes nothing.
#[async_trait]
pub trait LockedOrder: Send {
    /// The order as read after the lock was acquired.
    fn order(&self) -> &Order;

    /// Writes the changes atomically and releases the lock.
    ///
    /// Entitlements that already exist are skipped, not errors.
    async fn commit(self: Box<Self>, changes: OrderChanges) -> Result<(), DomainError>;

    /// Releases the lock without writing.
    async fn release(self: Box<Self>) -> Result<(), DomainError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order. A reused external reference fails with
    /// `ErrorCode::DuplicateReference`.
    async fn insert(&self, order: &Order) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Option<Order>, DomainError>;

    /// Paid orders for an email, newest first.
    async fn find_paid_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError>;

    /// PENDING (or CREATED) orders created before `created_before`, oldest first.
    async fn list_stale_pending(
        &self,
        created_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<Order>, DomainError>;

    /// Sets `delivered_at` on a paid order if not already set.
    async fn mark_delivered(&self, id: &OrderId, at: Timestamp) -> Result<(), DomainError>;

    /// Locks the order with this external reference. `None` when no such order.
    async fn lock_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Box<dyn LockedOrder>>, DomainError>;
}
