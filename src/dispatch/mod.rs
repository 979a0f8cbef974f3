//! Applies write requests produced by the jobs.
//!
//! Two queues feed the store: a pool of workers drains unordered requests
//! concurrently, and a single worker drains ordered requests one at a time in
//! the order they were submitted. Failed writes are logged and dropped.

pub mod request;

pub use request::{WriteClass, WriteRequest};

use crate::{
    constants::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, ORDERED_QUEUE_CAPACITY},
    error::{DbError, DispatchError}
};
use async_trait::async_trait;
use futures::FutureExt;
use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc
    }
};
use tokio::{
    sync::{mpsc, watch, Mutex, RwLock},
    task::JoinSet
};
use tracing::{debug, error, info, trace};

#[async_trait]
pub trait WriteExecutor: Send + Sync {
    /// Runs one request, returning the number of affected rows
    async fn execute(&self, request: &WriteRequest) -> Result<u64, DbError>;
}

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Size of the unordered worker pool
    pub workers: usize,
    pub queue_capacity: usize,
    pub ordered_capacity: usize
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ordered_capacity: ORDERED_QUEUE_CAPACITY
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub applied: u64,
    pub failed: u64
}

#[derive(Default)]
struct Counters {
    applied: AtomicU64,
    failed: AtomicU64
}

pub struct WriteDispatcher {
    unordered: RwLock<Option<mpsc::Sender<WriteRequest>>>,
    ordered: RwLock<Option<mpsc::Sender<WriteRequest>>>,
    workers: Mutex<JoinSet<()>>,
    /// Requests accepted but not yet applied
    pending: Arc<watch::Sender<usize>>,
    counters: Arc<Counters>
}

impl WriteDispatcher {
    /// Spawns the worker pool and the ordered worker. Must be called from
    /// within a tokio runtime.
    pub fn start(executor: Arc<dyn WriteExecutor>, config: DispatcherConfig) -> Self {
        let (unordered_tx, unordered_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (ordered_tx, ordered_rx) = mpsc::channel(config.ordered_capacity.max(1));
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);
        let counters = Arc::new(Counters::default());

        let mut workers = JoinSet::new();
        let shared_rx = Arc::new(Mutex::new(unordered_rx));
        for id in 0..config.workers.max(1) {
            workers.spawn(unordered_worker(
                id,
                Arc::clone(&shared_rx),
                Arc::clone(&executor),
                Arc::clone(&pending),
                Arc::clone(&counters)
            ));
        }
        workers.spawn(ordered_worker(ordered_rx, executor, Arc::clone(&pending), Arc::clone(&counters)));

        info!(workers = config.workers.max(1), "Write dispatcher started");

        WriteDispatcher {
            unordered: RwLock::new(Some(unordered_tx)),
            ordered: RwLock::new(Some(ordered_tx)),
            workers: Mutex::new(workers),
            pending,
            counters
        }
    }

    /// Queues a request on the queue matching its class. Waits while that
    /// queue is full.
    pub async fn submit(&self, request: WriteRequest) -> Result<(), DispatchError> {
        let sender = match request.class {
            WriteClass::Unordered => self.unordered.read().await.clone(),
            WriteClass::Ordered => self.ordered.read().await.clone()
        }
        .ok_or(DispatchError::Closed)?;

        self.pending.send_modify(|n| *n += 1);
        if sender.send(request).await.is_err() {
            self.pending.send_modify(|n| *n -= 1);
            return Err(DispatchError::Closed);
        }

        Ok(())
    }

    /// Waits until every request accepted so far has been applied (or has failed)
    pub async fn flush(&self) {
        let mut pending = self.pending.subscribe();
        // Errors only once the sender is gone, which cannot outlive `self`
        let _ = pending.wait_for(|n| *n == 0).await;
    }

    /// Stops accepting requests, drains both queues and waits for every worker
    /// to exit. Calling it again is a no-op.
    pub async fn close(&self) -> DispatchSummary {
        self.unordered.write().await.take();
        self.ordered.write().await.take();

        let mut workers = self.workers.lock().await;
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!("write worker failed: {}", e);
            }
        }

        let summary = self.summary();
        info!(applied = summary.applied, failed = summary.failed, "Write dispatcher drained");
        summary
    }

    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            applied: self.counters.applied.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed)
        }
    }
}

async fn unordered_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<WriteRequest>>>,
    executor: Arc<dyn WriteExecutor>,
    pending: Arc<watch::Sender<usize>>,
    counters: Arc<Counters>
) {
    loop {
        // The lock is only held while waiting for the next request, never
        // while executing it
        let next = receiver.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };

        apply(executor.as_ref(), &request, &counters).await;
        pending.send_modify(|n| *n -= 1);
    }

    debug!(worker = id, "Unordered writer exited");
}

async fn ordered_worker(
    mut receiver: mpsc::Receiver<WriteRequest>,
    executor: Arc<dyn WriteExecutor>,
    pending: Arc<watch::Sender<usize>>,
    counters: Arc<Counters>
) {
    while let Some(request) = receiver.recv().await {
        apply(executor.as_ref(), &request, &counters).await;
        pending.send_modify(|n| *n -= 1);
    }

    debug!("Ordered writer exited");
}

/// A panicking executor counts as a failed write; the worker stays alive so
/// the pending count still drops
async fn apply(executor: &dyn WriteExecutor, request: &WriteRequest, counters: &Counters) {
    match AssertUnwindSafe(executor.execute(request)).catch_unwind().await {
        Ok(Ok(rows)) => {
            counters.applied.fetch_add(1, Ordering::Relaxed);
            trace!(query = request.query, params = ?request.params, rows, "Applied write");
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(query = request.query, params = ?request.params, error = %e, "Query error");
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(query = request.query, params = ?request.params, "Write executor panicked");
        }
    }
}
