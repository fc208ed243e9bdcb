//! Bounded pool of background operation processors.
//!
//! A semaphore caps how many operations run at once. The slot is reserved at
//! submission time, before the record is stored, so a rejected submission
//! never leaves a pending record behind. Each running operation owns a
//! cancellation token that is a child of the pool's shutdown token.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domain::DomainError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// A reserved worker slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

type TokenMap = Arc<Mutex<HashMap<String, CancellationToken>>>;

#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    tokens: TokenMap,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            tokens: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of slots currently reserved or running.
    pub fn active(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Reserves a slot without waiting.
    pub fn try_reserve(&self) -> Result<WorkerSlot, DomainError> {
        if self.tracker.is_closed() {
            return Err(DomainError::ConcurrencyLimitReached {
                max: self.max_concurrent,
            });
        }
        self.semaphore
            .clone()
            .try_acquire_owned()
            .map(|permit| WorkerSlot { _permit: permit })
            .map_err(|_| DomainError::ConcurrencyLimitReached {
                max: self.max_concurrent,
            })
    }

    /// Runs `task` in the background on a reserved slot.
    ///
    /// The task receives the operation's cancellation token. The slot and the
    /// token are released when the task returns.
    pub fn spawn<F, Fut>(&self, operation_id: &str, slot: WorkerSlot, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation_id.to_string(), token.clone());

        let tokens = Arc::clone(&self.tokens);
        let id = operation_id.to_string();
        let future = task(token);

        self.tracker.spawn(async move {
            future.await;
            tokens
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            drop(slot);
            debug!(operation_id = %id, "Worker slot released");
        });
    }

    /// Signals the processor of `operation_id` to stop. Returns false when no
    /// processor is running for it.
    pub fn cancel(&self, operation_id: &str) -> bool {
        let token = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operation_id)
            .cloned();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops accepting work and waits for running processors.
    ///
    /// Processors still running after `timeout` are cancelled and given the
    /// same timeout again to exit. Returns true when every processor finished
    /// on its own.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        info!(running = self.tracker.len(), "Waiting for bulk operation processors");

        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
            info!("All bulk operation processors finished");
            return true;
        }

        warn!(
            running = self.tracker.len(),
            "Shutdown timeout reached, cancelling bulk operation processors"
        );
        self.shutdown.cancel();
        if tokio::time::timeout(timeout, self.tracker.wait()).await.is_err() {
            warn!(
                running = self.tracker.len(),
                "Bulk operation processors did not stop"
            );
        }
        false
    }
}
