//! Bounded tokio channel carrying document jobs to an in-process consumer.
//!
//! The producer side never waits. The consumer drops jobs whose idempotency
//! key it has already handled, so redelivered jobs run once per process.

use std::collections::HashSet;
use tokio::sync::mpsc;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{DocumentJob, DocumentJobQueue};

#[derive(Clone, Debug)]
pub struct ChannelJobQueue {
    sender: mpsc::Sender<DocumentJob>,
}

impl ChannelJobQueue {
    /// Creates the queue and the receiving half to run as a worker.
    pub fn new(capacity: usize) -> (Self, DocumentJobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self { sender },
            DocumentJobReceiver {
                receiver,
                seen: HashSet::new(),
            },
        )
    }
}

impl DocumentJobQueue for ChannelJobQueue {
    fn enqueue(&self, job: DocumentJob) -> Result<(), DomainError> {
        self.sender.try_send(job).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "document queue full",
                mpsc::error::TrySendError::Closed(_) => "document queue closed",
            };
            DomainError::new(ErrorCode::QueueError, reason)
        })
    }
}

/// Consumer half of `ChannelJobQueue`.
pub struct DocumentJobReceiver {
    receiver: mpsc::Receiver<DocumentJob>,
    seen: HashSet<String>,
}

impl DocumentJobReceiver {
    /// Next job not seen before, or `None` once every sender is gone.
    pub async fn next_job(&mut self) -> Option<DocumentJob> {
        while let Some(job) = self.receiver.recv().await {
            if self.seen.insert(job.idempotency_key.clone()) {
                return Some(job);
            }
            tracing::debug!(key = %job.idempotency_key, "Duplicate document job skipped");
        }
        None
    }

    /// Hands each distinct job to `handle` until the queue closes.
    pub async fn run<F>(mut self, mut handle: F)
    where
        F: FnMut(DocumentJob) + Send,
    {
        while let Some(job) = self.next_job().await {
            handle(job);
        }
        tracing::info!("Document job queue closed");
    }
}
