//! Bounded executor for blocking provider calls.

use crate::{DuetError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Runs blocking jobs on tokio's blocking threads, at most `capacity` at a time.
///
/// Callers wait for a free slot asynchronously, so a saturated pool delays the
/// requests that need it without stalling anything else on the runtime.
#[derive(Clone)]
pub struct ModelWorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl ModelWorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held by a running job
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DuetError::Worker(format!("worker pool closed: {e}")))?;
        debug!(target: "worker", available = self.permits.available_permits(), "Dispatching blocking job");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        handle.await.map_err(|e| {
            error!(target: "worker", error = %e, "Blocking job did not complete");
            DuetError::Worker(e.to_string())
        })?
    }
}
