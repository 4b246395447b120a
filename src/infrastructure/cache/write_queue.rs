//! Background cache maintenance.
//!
//! Cache refreshes and evictions scheduled on the redirect path never block
//! the caller. They are pushed onto a bounded queue and applied by
//! [`run_cache_worker`]; when the queue is full the task is dropped and
//! counted.
//!
//! A dropped task leaves the previous snapshot in the cache until its TTL
//! runs out. For a dropped eviction of a last-redirect snapshot that means
//! redirects keep being served past the budget for up to the cache TTL.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::service::CacheService;
use crate::domain::entities::CacheEntry;

/// A deferred cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTask {
    /// Overwrite the snapshot for `code`.
    Refresh {
        code: String,
        entry: CacheEntry,
        ttl_seconds: Option<u64>,
    },
    /// Remove the snapshot for `code`.
    Evict { code: String },
}

impl CacheTask {
    pub fn code(&self) -> &str {
        match self {
            CacheTask::Refresh { code, .. } | CacheTask::Evict { code } => code,
        }
    }
}

/// Sending half of the cache task queue.
#[derive(Clone)]
pub struct CacheWriteQueue {
    tx: mpsc::Sender<CacheTask>,
}

impl CacheWriteQueue {
    /// Creates a queue holding at most `capacity` pending tasks.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CacheTask>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues a task without waiting.
    ///
    /// Returns false when the task was dropped because the queue is full or
    /// the worker has stopped.
    pub fn schedule(&self, task: CacheTask) -> bool {
        match self.tx.try_send(task) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to enqueue cache task");
                metrics::counter!("cache_tasks_dropped_total").increment(1);
                false
            }
        }
    }
}

/// Applies queued cache tasks until every sender is dropped.
pub async fn run_cache_worker(mut rx: mpsc::Receiver<CacheTask>, cache: Arc<dyn CacheService>) {
    while let Some(task) = rx.recv().await {
        let result = match &task {
            CacheTask::Refresh {
                code,
                entry,
                ttl_seconds,
            } => cache.set_entry(code, entry, *ttl_seconds).await,
            CacheTask::Evict { code } => cache.invalidate(code).await,
        };

        if let Err(e) = result {
            warn!(code = task.code(), error = %e, "cache task failed");
        }
    }
    debug!("Cache worker stopped");
}
