//! DocumentJobQueue port - hand-off to the document generation pipeline.
//!
//! `enqueue` never waits: a full or closed queue is an error the caller logs.
//! Delivery is at-least-once; consumers deduplicate on `idempotency_key`.

use crate::domain::foundation::{DomainError, OrderId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    pub order_id: OrderId,
    pub product_sku: String,
    pub idempotency_key: String,
}

impl DocumentJob {
    pub fn for_order(order_id: OrderId, product_sku: impl Into<String>) -> Self {
        Self {
            order_id,
            product_sku: product_sku.into(),
            idempotency_key: format!("document:{}", order_id),
        }
    }
}

pub trait DocumentJobQueue: Send + Sync {
    fn enqueue(&self, job: DocumentJob) -> Result<(), DomainError>;
}
