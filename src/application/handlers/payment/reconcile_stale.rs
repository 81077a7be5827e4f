//! ReconcileStaleHandler - periodic sweep of orders whose notification never came.
//!
//! Each stale order goes through the same locked transition as a webhook, so
//! a notification racing the sweep still pays the order once.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::config::SweepConfig;
use crate::domain::foundation::Timestamp;
use crate::domain::payment::{Order, PaymentError};
use crate::ports::{OrderRepository, ProviderReconciler};

use super::post_payment::PostPaymentActions;
use super::transition_payment::{TransitionOutcome, TransitionPaymentCommand, TransitionPaymentHandler};

/// Claimed status recorded for sweep-initiated transitions.
pub const SWEEP_CLAIM: &str = "SWEEP";

#[derive(Debug, Clone, Copy)]
pub struct ReconcileStaleCommand {
    pub min_age: chrono::Duration,
    pub limit: u32,
    pub dry_run: bool,
}

impl ReconcileStaleCommand {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            min_age: config.min_age(),
            limit: config.batch_size,
            dry_run: config.dry_run,
        }
    }
}

/// Counts from one sweep. In a dry run `paid` and `failed` are what the
/// provider reported; nothing was written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub examined: usize,
    pub paid: usize,
    pub failed: usize,
    pub errors: usize,
    /// Already settled by the time the sweep reached them.
    pub skipped: usize,
}

enum Verdict {
    Paid,
    Failed,
    Error,
    Skipped,
}

pub struct ReconcileStaleHandler {
    orders: Arc<dyn OrderRepository>,
    reconciler: Arc<dyn ProviderReconciler>,
    transition: Arc<TransitionPaymentHandler>,
    post_payment: Arc<PostPaymentActions>,
    concurrency: usize,
}

impl ReconcileStaleHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        reconciler: Arc<dyn ProviderReconciler>,
        transition: Arc<TransitionPaymentHandler>,
        post_payment: Arc<PostPaymentActions>,
        concurrency: usize,
    ) -> Self {
        Self {
            orders,
            reconciler,
            transition,
            post_payment,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn handle(&self, cmd: ReconcileStaleCommand) -> Result<SweepSummary, PaymentError> {
        let cutoff = Timestamp::now().minus(cmd.min_age);
        let stale = self.orders.list_stale_pending(cutoff, cmd.limit).await?;
        let examined = stale.len();

        // Owned orders keep the buffered futures Send for the spawned sweep task.
        let verdicts: Vec<Verdict> = stream::iter(stale)
            .map(move |order| async move { self.sweep_one(&order, cmd.dry_run).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = SweepSummary {
            examined,
            ..SweepSummary::default()
        };
        for verdict in verdicts {
            match verdict {
                Verdict::Paid => summary.paid += 1,
                Verdict::Failed => summary.failed += 1,
                Verdict::Error => summary.errors += 1,
                Verdict::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            examined = summary.examined,
            paid = summary.paid,
            failed = summary.failed,
            errors = summary.errors,
            skipped = summary.skipped,
            dry_run = cmd.dry_run,
            "Reconciliation sweep finished"
        );
        Ok(summary)
    }

    async fn sweep_one(&self, order: &Order, dry_run: bool) -> Verdict {
        if dry_run {
            return match self.reconciler.check(&order.external_ref).await {
                Ok(verdict) if verdict.is_paid => Verdict::Paid,
                Ok(_) => Verdict::Failed,
                Err(err) => {
                    tracing::warn!(external_ref = %order.external_ref, error = %err, "Dry-run check failed");
                    Verdict::Error
                }
            };
        }

        match self
            .transition
            .handle(TransitionPaymentCommand::new(order.external_ref.clone(), SWEEP_CLAIM))
            .await
        {
            Ok(TransitionOutcome::TransitionedPaid { order, token }) => {
                self.post_payment.start(order, token);
                Verdict::Paid
            }
            Ok(TransitionOutcome::TransitionedFailed(_)) => Verdict::Failed,
            Ok(TransitionOutcome::AlreadyTerminal(_)) | Ok(TransitionOutcome::UnknownOrder) => {
                Verdict::Skipped
            }
            Err(err) => {
                tracing::warn!(external_ref = %order.external_ref, error = %err, "Sweep transition failed");
                Verdict::Error
            }
        }
    }
}
