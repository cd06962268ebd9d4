//! Bounded worker pool with caller-runs backpressure.
//!
//! Submission order of decisions for each task:
//! 1. fewer than `core_workers` live workers: start a worker with the task as its first job
//! 2. otherwise try to enqueue on the bounded queue (`task_queue_capacity`)
//! 3. queue full and fewer than `max_workers` live: start an extra worker for the task
//! 4. queue full and at `max_workers`: run the task on the submitting thread before returning
//!
//! Workers above `core_workers` exit after `max_idle` without work. `shutdown` closes the queue,
//! lets queued tasks finish and joins every worker.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::{debug, warn};
use serde::Serialize;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::timing::{NoHooks, TaskHooks, TaskRun};
use crate::error::{CrawlError, CrawlResult};
use crate::utils::config::{CrawlDefaults, PackagePaths};

/// Boxed unit of work accepted by the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool sizing. Immutable once the pool is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoolConfig {
    pub core_workers: usize,
    pub max_workers: usize,
    pub max_idle: Duration,
    pub task_queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_workers: CrawlDefaults::CORE_WORKERS,
            max_workers: CrawlDefaults::MAX_WORKERS,
            max_idle: Duration::from_secs(CrawlDefaults::MAX_IDLE_SECS),
            task_queue_capacity: CrawlDefaults::TASK_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Build and validate.
    pub fn new(
        core_workers: usize,
        max_workers: usize,
        max_idle_secs: u64,
        task_queue_capacity: usize,
    ) -> CrawlResult<Self> {
        let config = Self {
            core_workers,
            max_workers,
            max_idle: Duration::from_secs(max_idle_secs),
            task_queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero sizes and `core_workers > max_workers`.
    pub fn validate(&self) -> CrawlResult<()> {
        let invalid = |msg: String| Err(CrawlError::InvalidConfig(msg));
        if self.core_workers == 0 {
            return invalid("core_workers must be > 0".into());
        }
        if self.max_workers == 0 {
            return invalid("max_workers must be > 0".into());
        }
        if self.task_queue_capacity == 0 {
            return invalid("task_queue_capacity must be > 0".into());
        }
        if self.max_idle.is_zero() {
            return invalid("max_idle must be > 0".into());
        }
        if self.core_workers > self.max_workers {
            return invalid(format!(
                "core_workers ({}) > max_workers ({})",
                self.core_workers, self.max_workers
            ));
        }
        Ok(())
    }

    /// Lower `max_workers` (and `core_workers` if needed) to `cap`.
    pub fn capped(mut self, cap: usize) -> Self {
        let cap = cap.max(1);
        if self.max_workers > cap {
            debug!("Capping max workers {} -> {}", self.max_workers, cap);
            self.max_workers = cap;
            self.core_workers = self.core_workers.min(cap);
        }
        self
    }
}

/// What `submit` did with a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submission {
    /// Placed on the bounded queue.
    Queued,
    /// Handed to a newly started worker.
    NewWorker,
    /// Queue full and pool at `max_workers`: already ran on the submitting thread.
    CallerRan,
}

/// Pool counters (monotonic except `live`).
#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    queued: AtomicU64,
    caller_runs: AtomicU64,
    backpressure_events: AtomicU64,
    workers_spawned: AtomicU64,
    workers_retired: AtomicU64,
    peak_workers: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// Point-in-time copy of pool counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub submitted: u64,
    pub queued: u64,
    pub caller_runs: u64,
    pub backpressure_events: u64,
    pub workers_spawned: u64,
    pub workers_retired: u64,
    pub peak_workers: usize,
    pub live_workers: usize,
    pub completed: u64,
    pub panicked: u64,
}

/// State shared with worker threads.
struct Shared {
    config: PoolConfig,
    live: AtomicUsize,
    next_task_id: AtomicU64,
    next_worker_id: AtomicUsize,
    counters: Counters,
    hooks: Arc<dyn TaskHooks>,
}

impl Shared {
    /// Reserve a worker slot if fewer than `limit` are live.
    fn try_reserve(&self, limit: usize) -> bool {
        match self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            }) {
            Ok(prev) => {
                self.counters
                    .peak_workers
                    .fetch_max(prev + 1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }

    /// Give up a slot only while above `core_workers`.
    fn try_retire(&self) -> bool {
        let core = self.config.core_workers;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > core).then(|| n - 1)
            })
            .is_ok()
    }

    fn call_hook(&self, what: &str, hook: impl FnOnce(&dyn TaskHooks)) {
        let hooks = &*self.hooks;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(hooks))) {
            debug!("{} hook failed: {}", what, panic_message(payload.as_ref()));
        }
    }

    /// Run one job with hooks around it. Never unwinds.
    fn run_job(&self, job: QueuedJob, worker: Option<usize>) {
        let run = TaskRun {
            id: job.id,
            worker,
            started: Instant::now(),
        };
        self.call_hook("before_execute", |h| h.before_execute(&run));
        if let Err(payload) = catch_unwind(AssertUnwindSafe(job.job)) {
            self.counters.panicked.fetch_add(1, Ordering::Relaxed);
            warn!(
                "task {} panicked on {}: {}",
                run.id,
                run.runner(),
                panic_message(payload.as_ref())
            );
        }
        let elapsed = run.started.elapsed();
        self.call_hook("after_execute", |h| h.after_execute(&run, elapsed));
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }
}

struct QueuedJob {
    id: u64,
    job: Job,
}

fn worker_loop(
    shared: Arc<Shared>,
    receiver: Receiver<QueuedJob>,
    worker_id: usize,
    first: Option<QueuedJob>,
) {
    let mut next = first;
    loop {
        if let Some(job) = next.take() {
            shared.run_job(job, Some(worker_id));
        }
        match receiver.recv_timeout(shared.config.max_idle) {
            Ok(job) => next = Some(job),
            Err(RecvTimeoutError::Timeout) => {
                if shared.try_retire() {
                    shared
                        .counters
                        .workers_retired
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "worker-{} retired after {:?} idle",
                        worker_id, shared.config.max_idle
                    );
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    shared.live.fetch_sub(1, Ordering::SeqCst);
}

/// Fixed-size, elastically bounded set of worker threads fed by a bounded queue.
pub struct BoundedWorkerPool {
    shared: Arc<Shared>,
    /// `None` once shut down.
    sender: RwLock<Option<Sender<QueuedJob>>>,
    receiver: Receiver<QueuedJob>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl BoundedWorkerPool {
    /// Pool without instrumentation.
    pub fn new(config: PoolConfig) -> CrawlResult<Self> {
        Self::with_hooks(config, Arc::new(NoHooks))
    }

    /// Pool that calls `hooks` around every task.
    pub fn with_hooks(config: PoolConfig, hooks: Arc<dyn TaskHooks>) -> CrawlResult<Self> {
        config.validate()?;
        let (sender, receiver) = bounded(config.task_queue_capacity);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                live: AtomicUsize::new(0),
                next_task_id: AtomicU64::new(0),
                next_worker_id: AtomicUsize::new(0),
                counters: Counters::default(),
                hooks,
            }),
            sender: RwLock::new(Some(sender)),
            receiver,
            handles: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Submit a job. Never blocks on a full queue: see the module docs for the policy.
    ///
    /// Fails only with [`CrawlError::PoolShutdown`].
    pub fn submit(&self, job: Job) -> CrawlResult<Submission> {
        let id = self.shared.next_task_id.fetch_add(1, Ordering::Relaxed);
        let job = QueuedJob { id, job };

        // Worker spawns happen under the read lock so shutdown cannot miss a handle.
        let overflow = {
            let guard = self.sender.read().unwrap_or_else(|e| e.into_inner());
            let Some(sender) = guard.as_ref() else {
                return Err(CrawlError::PoolShutdown);
            };
            self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
            self.shared.call_hook("on_submit", |h| h.on_submit(id));

            if self.shared.try_reserve(self.shared.config.core_workers) {
                match self.spawn_worker(job) {
                    None => return Ok(Submission::NewWorker),
                    Some(job) => job,
                }
            } else {
                match sender.try_send(job) {
                    Ok(()) => {
                        self.shared.counters.queued.fetch_add(1, Ordering::Relaxed);
                        return Ok(Submission::Queued);
                    }
                    Err(TrySendError::Full(job)) => {
                        self.shared
                            .counters
                            .backpressure_events
                            .fetch_add(1, Ordering::Relaxed);
                        if self.shared.try_reserve(self.shared.config.max_workers) {
                            match self.spawn_worker(job) {
                                None => return Ok(Submission::NewWorker),
                                Some(job) => job,
                            }
                        } else {
                            job
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => return Err(CrawlError::PoolShutdown),
                }
            }
        };

        // Saturated: run on the submitting thread, outside the lock.
        self.shared
            .counters
            .caller_runs
            .fetch_add(1, Ordering::Relaxed);
        debug!(
            "pool saturated ({} workers, queue {}): running task {} on caller",
            self.shared.live.load(Ordering::Relaxed),
            self.shared.config.task_queue_capacity,
            overflow.id
        );
        self.shared.run_job(overflow, None);
        Ok(Submission::CallerRan)
    }

    /// Start a worker on an already reserved slot. Returns the job back if the thread could not
    /// be created (slot released).
    fn spawn_worker(&self, first: QueuedJob) -> Option<QueuedJob> {
        let worker_id = self.shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let handoff = Arc::new(Mutex::new(Some(first)));
        let theirs = Arc::clone(&handoff);
        let shared = Arc::clone(&self.shared);
        let receiver = self.receiver.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", PackagePaths::get().worker_prefix(), worker_id))
            .spawn(move || {
                let first = theirs.lock().unwrap_or_else(|e| e.into_inner()).take();
                worker_loop(shared, receiver, worker_id, first)
            });
        match spawned {
            Ok(handle) => {
                self.shared
                    .counters
                    .workers_spawned
                    .fetch_add(1, Ordering::Relaxed);
                let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
                // Retired workers have already exited; dropping their handles releases the thread.
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                None
            }
            Err(e) => {
                warn!("failed to start worker thread: {}", e);
                self.shared.live.fetch_sub(1, Ordering::SeqCst);
                handoff.lock().unwrap_or_else(|e| e.into_inner()).take()
            }
        }
    }

    /// Stop accepting work, let queued tasks finish, join all workers. Idempotent.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(sender) = sender else {
            return;
        };
        // Dropping the only sender lets workers drain the queue and then see the channel close.
        drop(sender);

        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|e| e.into_inner()));
        let me = thread::current().id();
        for handle in handles {
            if handle.thread().id() == me {
                continue;
            }
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        self.shut_down.store(true, Ordering::Release);
        self.shared.call_hook("terminated", |h| h.terminated());
        debug!("pool terminated: {:?}", self.stats());
    }

    /// True once `shutdown` has started.
    pub fn is_shutdown(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// True once `shutdown` has joined every worker.
    pub fn is_terminated(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Worker threads the pool still holds a handle for, including retired ones not yet reaped.
    pub fn tracked_workers(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Tasks waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> PoolStats {
        let c = &self.shared.counters;
        PoolStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            queued: c.queued.load(Ordering::Relaxed),
            caller_runs: c.caller_runs.load(Ordering::Relaxed),
            backpressure_events: c.backpressure_events.load(Ordering::Relaxed),
            workers_spawned: c.workers_spawned.load(Ordering::Relaxed),
            workers_retired: c.workers_retired.load(Ordering::Relaxed),
            peak_workers: c.peak_workers.load(Ordering::Relaxed),
            live_workers: self.live_workers(),
            completed: c.completed.load(Ordering::Relaxed),
            panicked: c.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BoundedWorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
