//! Follow-up work after an order reaches PAID.
//!
//! Runs once per PAID transition, from whichever path performed it. Neither
//! step can undo the payment. The email goes out on its own task so a slow
//! mailer never holds the caller's request open past its timeout.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::application::handlers::delivery::FulfillmentDispatcher;
use crate::domain::delivery::DownloadToken;
use crate::domain::payment::Order;
use crate::ports::{DocumentJob, DocumentJobQueue};

pub struct PostPaymentActions {
    fulfillment: Arc<FulfillmentDispatcher>,
    jobs: Arc<dyn DocumentJobQueue>,
}

impl PostPaymentActions {
    pub fn new(fulfillment: Arc<FulfillmentDispatcher>, jobs: Arc<dyn DocumentJobQueue>) -> Self {
        Self { fulfillment, jobs }
    }

    /// Enqueues document generation and spawns the fulfillment email.
    /// Returns without waiting for the email; failures are logged only.
    pub fn start(&self, order: Order, token: DownloadToken) -> JoinHandle<()> {
        if let Err(err) = self
            .jobs
            .enqueue(DocumentJob::for_order(order.id, order.product_sku.clone()))
        {
            tracing::warn!(order_id = %order.id, error = %err, "Document job not enqueued");
        }

        let fulfillment = Arc::clone(&self.fulfillment);
        tokio::spawn(async move {
            // The dispatcher logs its own failures; resend recovers them.
            let _ = fulfillment.dispatch(&order, &token).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::RecordingMailer;
    use crate::adapters::jobs::RecordingJobQueue;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::delivery::LinkBuilder;
    use crate::domain::delivery::{BonusLinkSigner, UrlSigner};
    use crate::domain::entitlement::Catalog;
    use crate::domain::foundation::Timestamp;
    use chrono::Duration;
    use secrecy::SecretString;

    fn actions(store: &InMemoryStore, mailer: &RecordingMailer, jobs: &RecordingJobQueue) -> PostPaymentActions {
        let secret = SecretString::new("k".repeat(32));
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
        PostPaymentActions::new(fulfillment, Arc::new(jobs.clone()))
    }

    async fn paid_order(store: &InMemoryStore) -> (Order, DownloadToken) {
        let now = Timestamp::now();
        let mut order =
            Order::with_reference("EBOOK_ASP", "buyer@example.com", 15000, "XOF", "TXN-1", now).unwrap();
        order.mark_paid(Some("PAY-1".to_string()), now).unwrap();
        store.put_order(order.clone()).await;
        let token = DownloadToken::mint_read(order.id, Duration::hours(72), now);
        (order, token)
    }

    #[tokio::test]
    async fn start_returns_before_a_slow_mailer_finishes() {
        let store = InMemoryStore::new();
        let mailer = RecordingMailer::new();
        mailer.set_delay(std::time::Duration::from_millis(300));
        let jobs = RecordingJobQueue::new();
        let actions = actions(&store, &mailer, &jobs);
        let (order, token) = paid_order(&store).await;

        let handle = actions.start(order, token);

        assert_eq!(jobs.jobs().len(), 1);
        assert!(mailer.sent().is_empty());
        handle.await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }
}
