// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded worker pool for fire-and-forget augmentation work.
//!
//! Tasks are tracked by a [`TaskTracker`] so callers can drain them, and
//! gated by a semaphore so at most `max_workers` run at once. Tasks beyond
//! that limit are spawned but park on the semaphore until a permit frees.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mnemo_core::MnemoError;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug};

/// Handle to the shared augmentation pool. Cloning shares the pool.
#[derive(Clone)]
pub struct AugmentationPool {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl AugmentationPool {
    /// Creates a pool running at most `max_workers` tasks concurrently.
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of tasks spawned and not yet finished.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Submits a task. Returns immediately; the task runs once a worker
    /// permit is available, inside the caller's current span.
    ///
    /// Fails only when called outside a tokio runtime.
    pub fn spawn<F>(&self, task: F) -> Result<(), MnemoError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            MnemoError::Internal(format!("augmentation pool needs a tokio runtime: {e}"))
        })?;
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn_on(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                task.await;
            }
            .in_current_span(),
            &handle,
        );
        Ok(())
    }

    /// Waits until every submitted task has finished, or `timeout` elapses.
    ///
    /// Returns `false` on timeout. Tasks submitted while waiting are
    /// included. The pool keeps accepting work afterwards.
    pub async fn wait(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        debug!(drained, pending = self.tracker.len(), "augmentation pool wait finished");
        drained
    }
}

impl std::fmt::Debug for AugmentationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AugmentationPool")
            .field("max_workers", &self.max_workers)
            .field("pending", &self.tracker.len())
            .finish()
    }
}
