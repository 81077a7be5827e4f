//! In-memory implementation of the storage ports.
//!
//! One `InMemoryStore` backs orders, the ledger, tokens and entitlements so a
//! committed transition lands in all of them together. Per-reference async
//! mutexes stand in for PostgreSQL row locks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::delivery::{DownloadToken, TokenKind};
use crate::domain::entitlement::{Entitlement, EntitlementSource};
use crate::domain::foundation::{DomainError, ErrorCode, LedgerEntryId, OrderId, Timestamp};
use crate::domain::payment::{LedgerEntry, LedgerOutcome, NewLedgerEntry, Order, OrderStatus};
use crate::ports::{
    DownloadTokenRepository, EntitlementRepository, LockedOrder, OrderChanges, OrderRepository,
    WebhookLedger,
};

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    ledger: Vec<LedgerEntry>,
    tokens: Vec<DownloadToken>,
    entitlements: Vec<Entitlement>,
}

impl Tables {
    fn order_by_ref(&self, external_ref: &str) -> Option<&Order> {
        self.orders.values().find(|o| o.external_ref == external_ref)
    }

    fn insert_entitlement(&mut self, entitlement: &Entitlement) -> bool {
        let key = entitlement.discriminator();
        let exists = self.entitlements.iter().any(|e| {
            e.email == entitlement.email
                && e.category == entitlement.category
                && e.source == entitlement.source
                && e.discriminator() == key
        });
        if exists {
            return false;
        }
        self.entitlements.push(entitlement.clone());
        true
    }
}

/// Shared in-memory tables. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    row_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    ledger_unavailable: Arc<AtomicBool>,
    locks_unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every ledger write fail until reset.
    pub fn set_ledger_unavailable(&self, unavailable: bool) {
        self.ledger_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every row lock attempt time out until reset.
    pub fn set_locks_unavailable(&self, unavailable: bool) {
        self.locks_unavailable.store(unavailable, Ordering::SeqCst);
    }

    // === Test Helpers ===

    pub async fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.tables.lock().await.ledger.clone()
    }

    pub async fn tokens(&self) -> Vec<DownloadToken> {
        self.tables.lock().await.tokens.clone()
    }

    pub async fn entitlements(&self) -> Vec<Entitlement> {
        self.tables.lock().await.entitlements.clone()
    }

    /// Replaces a stored order as-is, bypassing lifecycle checks.
    pub async fn put_order(&self, order: Order) {
        self.tables.lock().await.orders.insert(order.id, order);
    }

    async fn row_lock(&self, external_ref: &str) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks
            .entry(external_ref.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn check_ledger_available(&self) -> Result<(), DomainError> {
        if self.ledger_unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Ledger unavailable"));
        }
        Ok(())
    }
}

/// An order held under its per-reference mutex.
pub struct InMemoryLockedOrder {
    store: InMemoryStore,
    order: Order,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockedOrder for InMemoryLockedOrder {
    fn order(&self) -> &Order {
        &self.order
    }

    async fn commit(self: Box<Self>, changes: OrderChanges) -> Result<(), DomainError> {
        let mut tables = self.store.tables.lock().await;

        let stored = tables
            .orders
            .get(&changes.order.id)
            .ok_or_else(|| DomainError::new(ErrorCode::OrderNotFound, "Order not found"))?;
        if stored.amount != changes.order.amount || stored.currency != changes.order.currency {
            return Err(DomainError::database("order price is immutable"));
        }

        tables.orders.insert(changes.order.id, changes.order);
        if let Some(token) = changes.token {
            tables.tokens.push(token);
        }
        for entitlement in &changes.entitlements {
            tables.insert_entitlement(entitlement);
        }
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if tables.order_by_ref(&order.external_ref).is_some() {
            return Err(DomainError::new(
                ErrorCode::DuplicateReference,
                "External reference already used",
            ));
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.lock().await.orders.get(id).cloned())
    }

    async fn find_by_external_ref(&self, external_ref: &str) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.lock().await.order_by_ref(external_ref).cloned())
    }

    async fn find_paid_by_email(&self, email: &str) -> Result<Vec<Order>, DomainError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.email == email && o.status == OrderStatus::Paid)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(orders)
    }

    async fn list_stale_pending(
        &self,
        created_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<Order>, DomainError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| matches!(o.status, OrderStatus::Created | OrderStatus::Pending))
            .filter(|o| o.created_at.is_before(&created_before))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orders.truncate(limit as usize);
        Ok(orders)
    }

    async fn mark_delivered(&self, id: &OrderId, at: Timestamp) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if let Some(order) = tables.orders.get_mut(id) {
            if order.is_paid() && order.delivered_at.is_none() {
                order.delivered_at = Some(at);
            }
        }
        Ok(())
    }

    async fn lock_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Box<dyn LockedOrder>>, DomainError> {
        if self.locks_unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Failed to lock order: lock timeout"));
        }
        let guard = self.row_lock(external_ref).await.lock_owned().await;
        let order = self.tables.lock().await.order_by_ref(external_ref).cloned();
        Ok(order.map(|order| {
            Box::new(InMemoryLockedOrder {
                store: self.clone(),
                order,
                _guard: guard,
            }) as Box<dyn LockedOrder>
        }))
    }
}

#[async_trait]
impl WebhookLedger for InMemoryStore {
    async fn record(&self, entry: NewLedgerEntry) -> Result<LedgerEntryId, DomainError> {
        self.check_ledger_available()?;
        let id = LedgerEntryId::new();
        self.tables
            .lock()
            .await
            .ledger
            .push(LedgerEntry::from_new(id, entry));
        Ok(id)
    }

    async fn record_outcome(
        &self,
        id: &LedgerEntryId,
        outcome: LedgerOutcome,
    ) -> Result<(), DomainError> {
        self.check_ledger_available()?;
        let mut tables = self.tables.lock().await;
        if let Some(entry) = tables.ledger.iter_mut().find(|e| e.id == *id) {
            if entry.outcome.is_none() {
                entry.outcome = Some(outcome);
                entry.http_status = Some(outcome.http_status());
            }
        }
        Ok(())
    }

    async fn entries_for_ref(&self, claimed_ref: &str) -> Result<Vec<LedgerEntry>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .ledger
            .iter()
            .filter(|e| e.claimed_ref.as_deref() == Some(claimed_ref))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DownloadTokenRepository for InMemoryStore {
    async fn insert(&self, token: &DownloadToken) -> Result<(), DomainError> {
        let mut tables = self.tables.lock().await;
        if tables.tokens.iter().any(|t| t.value == token.value) {
            return Err(DomainError::database("Duplicate token value"));
        }
        tables.tokens.push(token.clone());
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<DownloadToken>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .tokens
            .iter()
            .find(|t| t.value == value)
            .cloned())
    }

    async fn find_usable_for_order(
        &self,
        order_id: &OrderId,
        kind: TokenKind,
        now: Timestamp,
    ) -> Result<Option<DownloadToken>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .tokens
            .iter()
            .filter(|t| t.order_id == *order_id && t.kind == kind && t.is_valid_at(now))
            .max_by(|a, b| a.expires_at.cmp(&b.expires_at))
            .cloned())
    }

    async fn list_for_order(&self, order_id: &OrderId) -> Result<Vec<DownloadToken>, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .tokens
            .iter()
            .filter(|t| t.order_id == *order_id)
            .cloned()
            .collect())
    }

    async fn try_consume(&self, value: &str, now: Timestamp) -> Result<Option<DownloadToken>, DomainError> {
        let mut tables = self.tables.lock().await;
        let Some(token) = tables
            .tokens
            .iter_mut()
            .find(|t| t.value == value && t.kind == TokenKind::Consumable)
        else {
            return Ok(None);
        };
        if !token.is_valid_at(now) {
            return Ok(None);
        }
        token.used_count += 1;
        Ok(Some(token.clone()))
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryStore {
    async fn grant(&self, entitlement: &Entitlement) -> Result<bool, DomainError> {
        Ok(self.tables.lock().await.insert_entitlement(entitlement))
    }

    async fn exists_for_email(&self, email: &str, category: &str) -> Result<bool, DomainError> {
        Ok(self
            .tables
            .lock()
            .await
            .entitlements
            .iter()
            .any(|e| e.email == email && e.category == category))
    }

    async fn exists_for_claim_code(&self, claim_code: &str, category: &str) -> Result<bool, DomainError> {
        Ok(self.tables.lock().await.entitlements.iter().any(|e| {
            e.claim_code.as_deref() == Some(claim_code) && e.category == category
        }))
    }

    async fn categories_for_email(&self, email: &str) -> Result<Vec<String>, DomainError> {
        let tables = self.tables.lock().await;
        let mut categories: Vec<String> = tables
            .entitlements
            .iter()
            .filter(|e| e.email == email)
            .map(|e| e.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}
