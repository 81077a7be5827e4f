//! Recording job queue for tests.

use std::sync::{Arc, Mutex};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{DocumentJob, DocumentJobQueue};

#[derive(Default)]
struct RecordingState {
    jobs: Vec<DocumentJob>,
    unavailable: bool,
}

#[derive(Clone, Default)]
pub struct RecordingJobQueue {
    inner: Arc<Mutex<RecordingState>>,
}

impl RecordingJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn jobs(&self) -> Vec<DocumentJob> {
        self.lock().jobs.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentJobQueue for RecordingJobQueue {
    fn enqueue(&self, job: DocumentJob) -> Result<(), DomainError> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(DomainError::new(ErrorCode::QueueError, "document queue full"));
        }
        state.jobs.push(job);
        Ok(())
    }
}
