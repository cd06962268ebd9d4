//! Completion-order result collection on top of [`BoundedWorkerPool`].

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::engine::pool::{BoundedWorkerPool, Submission, panic_message};
use crate::error::{CrawlError, CrawlResult};

/// Wraps callables as pool jobs and hands their results back in the order they finish.
///
/// Each task's failure (error or panic) is captured and returned by the `take` that receives
/// it; it never crosses into the worker or the submitter.
pub struct CompletionCollector<T> {
    pool: Arc<BoundedWorkerPool>,
    done_tx: Sender<CrawlResult<T>>,
    done_rx: Receiver<CrawlResult<T>>,
    pending: Arc<AtomicUsize>,
}

impl<T: Send + 'static> CompletionCollector<T> {
    pub fn new(pool: Arc<BoundedWorkerPool>) -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            pool,
            done_tx,
            done_rx,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pool(&self) -> &Arc<BoundedWorkerPool> {
        &self.pool
    }

    /// Submit `task` to the pool. With a saturated pool the task has already run when this returns.
    pub fn submit<F>(&self, task: F) -> CrawlResult<Submission>
    where
        F: FnOnce() -> CrawlResult<T> + Send + 'static,
    {
        let done_tx = self.done_tx.clone();
        let job = move || {
            let result = catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
                Err(CrawlError::TaskPanicked(panic_message(payload.as_ref())))
            });
            // Receiver lives as long as the collector; a send error means nobody will take it.
            let _ = done_tx.send(result);
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.pool.submit(Box::new(job)).inspect_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        })
    }

    /// Block until the next task finishes and return its result (or its captured failure).
    ///
    /// Blocks forever if nothing is outstanding; callers drain exactly as many results as they
    /// submitted.
    pub fn take(&self) -> CrawlResult<T> {
        match self.done_rx.recv() {
            Ok(result) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                result
            }
            // Unreachable while `self` holds `done_tx`.
            Err(_) => Err(CrawlError::PoolShutdown),
        }
    }

    /// Next finished result, if one is ready.
    pub fn poll(&self) -> Option<CrawlResult<T>> {
        let result = self.done_rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(result)
    }

    /// Like [`take`](Self::take) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<CrawlResult<T>> {
        match self.done_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Submitted tasks whose results have not been taken yet (running, queued or finished).
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Finished results waiting to be taken.
    pub fn ready(&self) -> usize {
        self.done_rx.len()
    }
}
