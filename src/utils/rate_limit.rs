use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps how many documents are processed at the same time.
#[derive(Clone)]
pub struct WorkerLimiter {
    semaphore: Arc<Semaphore>,
}

impl WorkerLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        WorkerLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker limiter closed")
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
