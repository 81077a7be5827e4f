//! ResendLinksHandler - sends a paid order's links again.
//!
//! Buyers ask by email and never learn whether anything matched; operators
//! ask by order id and get the real result.

use std::sync::Arc;

use crate::domain::delivery::FulfillmentError;
use crate::domain::foundation::{normalize_email, OrderId};
use crate::domain::payment::Order;
use crate::ports::OrderRepository;

use super::fulfillment::FulfillmentDispatcher;
use super::token_issuer::TokenIssuer;

/// How many paid orders were found and how many emails went out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResendSummary {
    pub orders_found: usize,
    pub sent: usize,
}

pub struct ResendLinksHandler {
    orders: Arc<dyn OrderRepository>,
    tokens: Arc<TokenIssuer>,
    fulfillment: Arc<FulfillmentDispatcher>,
}

impl ResendLinksHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        tokens: Arc<TokenIssuer>,
        fulfillment: Arc<FulfillmentDispatcher>,
    ) -> Self {
        Self {
            orders,
            tokens,
            fulfillment,
        }
    }

    /// Resends every paid order for `email`. Send failures are counted, not raised.
    pub async fn by_email(&self, email: &str) -> Result<ResendSummary, FulfillmentError> {
        let Some(email) = normalize_email(email) else {
            return Ok(ResendSummary::default());
        };
        let orders = self.orders.find_paid_by_email(&email).await?;

        let mut summary = ResendSummary {
            orders_found: orders.len(),
            sent: 0,
        };
        for order in &orders {
            match self.resend(order).await {
                Ok(()) => summary.sent += 1,
                Err(err) => {
                    tracing::warn!(order_id = %order.id, error = %err, "Resend failed");
                }
            }
        }
        tracing::info!(orders_found = summary.orders_found, sent = summary.sent, "Self-service resend");
        Ok(summary)
    }

    /// Operator resend for one order.
    pub async fn by_order(&self, order_id: &OrderId) -> Result<(), FulfillmentError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_id.to_string()))?;
        if !order.is_paid() {
            return Err(FulfillmentError::OrderNotPaid(order.id.to_string()));
        }
        self.resend(&order).await
    }

    async fn resend(&self, order: &Order) -> Result<(), FulfillmentError> {
        let token = self.tokens.ensure(order).await?;
        self.fulfillment.dispatch(order, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::RecordingMailer;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::delivery::{LinkBuilder, TokenPolicy};
    use crate::domain::delivery::{BonusLinkSigner, UrlSigner};
    use crate::domain::entitlement::Catalog;
    use crate::domain::foundation::Timestamp;
    use crate::ports::MailError;
    use chrono::Duration;
    use secrecy::SecretString;

    fn handler(store: &InMemoryStore, mailer: &RecordingMailer) -> ResendLinksHandler {
        let secret = SecretString::new("r".repeat(32));
        let tokens = Arc::new(TokenIssuer::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TokenPolicy::default(),
        ));
        let fulfillment = Arc::new(FulfillmentDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            Arc::new(Catalog::builtin().unwrap()),
            LinkBuilder::new(
                "https://shop.example",
                UrlSigner::new(secret.clone(), Duration::minutes(15)),
                BonusLinkSigner::new(secret, Duration::days(7)),
            ),
        ));
        ResendLinksHandler::new(Arc::new(store.clone()), tokens, fulfillment)
    }

    async fn order(store: &InMemoryStore, external_ref: &str, paid: bool) -> Order {
        let mut order =
            Order::with_reference("EBOOK_ASP", "buyer@example.com", 15000, "XOF", external_ref, Timestamp::now())
                .unwrap();
        if paid {
            order.mark_paid(None, Timestamp::now()).unwrap();
        }
        store.put_order(order.clone()).await;
        order
    }

    #[tokio::test]
    async fn by_email_resends_only_paid_orders() {
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        order(&store, "TXN-1", true).await;
        order(&store, "TXN-2", false).await;

        let summary = handler(&store, &mailer).by_email(" Buyer@Example.com ").await.unwrap();

        assert_eq!(summary, ResendSummary { orders_found: 1, sent: 1 });
        assert_eq!(mailer.sent_to("buyer@example.com").len(), 1);
        assert_eq!(store.tokens().await.len(), 1);
    }

    #[tokio::test]
    async fn by_email_with_unknown_address_is_silent() {
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        let summary = handler(&store, &mailer).by_email("stranger@example.com").await.unwrap();
        assert_eq!(summary, ResendSummary::default());
        assert!(handler(&store, &mailer).by_email("garbage").await.is_ok());
    }

    #[tokio::test]
    async fn by_order_reports_failures() {
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        let unpaid = order(&store, "TXN-2", false).await;
        let paid = order(&store, "TXN-1", true).await;
        let handler = handler(&store, &mailer);

        assert!(matches!(
            handler.by_order(&OrderId::new()).await,
            Err(FulfillmentError::OrderNotFound(_))
        ));
        assert!(matches!(
            handler.by_order(&unpaid.id).await,
            Err(FulfillmentError::OrderNotPaid(_))
        ));

        mailer.set_failure(Some(MailError::Rejected("bad address".into())));
        assert!(matches!(
            handler.by_order(&paid.id).await,
            Err(FulfillmentError::Mail(_))
        ));

        mailer.set_failure(None);
        handler.by_order(&paid.id).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }
}
