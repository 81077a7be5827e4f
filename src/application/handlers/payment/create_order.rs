//! CreateOrderHandler - checkout initiation.

use std::sync::Arc;

use crate::domain::entitlement::Catalog;
use crate::domain::foundation::{ErrorCode, Timestamp};
use crate::domain::payment::{Order, PaymentError};
use crate::ports::OrderRepository;

/// Attempts at drawing an unused external reference.
const MAX_REFERENCE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub product_sku: String,
    pub email: String,
}

/// Creates a PENDING order priced from the catalog. The client never
/// supplies an amount.
pub struct CreateOrderHandler {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<Catalog>,
}

impl CreateOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>, catalog: Arc<Catalog>) -> Self {
        Self { orders, catalog }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<Order, PaymentError> {
        let product = self
            .catalog
            .product(cmd.product_sku.trim())
            .ok_or_else(|| PaymentError::UnknownProduct(cmd.product_sku.clone()))?;

        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let mut order = Order::new(
                product.sku.clone(),
                &cmd.email,
                product.price,
                product.currency.clone(),
                Timestamp::now(),
            )
            .map_err(|e| PaymentError::Validation(e.to_string()))?;
            order.begin_payment()?;

            match self.orders.insert(&order).await {
                Ok(()) => {
                    tracing::info!(
                        order_id = %order.id,
                        external_ref = %order.external_ref,
                        sku = %order.product_sku,
                        amount = order.amount,
                        "Order created"
                    );
                    return Ok(order);
                }
                Err(err) if err.code == ErrorCode::DuplicateReference => {
                    tracing::warn!(external_ref = %order.external_ref, "External reference collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(PaymentError::Infrastructure(
            "could not allocate an external reference".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::payment::OrderStatus;

    fn handler(store: &InMemoryStore) -> CreateOrderHandler {
        CreateOrderHandler::new(Arc::new(store.clone()), Arc::new(Catalog::builtin().unwrap()))
    }

    #[tokio::test]
    async fn order_is_priced_from_catalog_and_pending() {
        let store = InMemoryStore::new();
        let order = handler(&store)
            .handle(CreateOrderCommand {
                product_sku: "EBOOK_ASP".into(),
                email: "Buyer@Example.com".into(),
            })
            .await
            .unwrap();

        assert_eq!(order.amount, 15000);
        assert_eq!(order.currency, "XOF");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.email, "buyer@example.com");
        let stored = store.find_by_external_ref(&order.external_ref).await.unwrap();
        assert_eq!(stored.map(|o| o.id), Some(order.id));
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let store = InMemoryStore::new();
        let err = handler(&store)
            .handle(CreateOrderCommand {
                product_sku: "NOPE".into(),
                email: "buyer@example.com".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn bad_email_is_a_validation_error() {
        let store = InMemoryStore::new();
        let err = handler(&store)
            .handle(CreateOrderCommand {
                product_sku: "EBOOK_ASP".into(),
                email: "nobody".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}
