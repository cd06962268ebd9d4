//! Per-task instrumentation for [`BoundedWorkerPool`](super::pool::BoundedWorkerPool).
//!
//! The pool knows nothing about timing; it calls a [`TaskHooks`] implementation around every
//! task. [`TimingHooks`] is the one used by the crawler: it counts tasks, sums per-task wall time
//! and logs a summary when the pool terminates.

use log::{info, trace};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Identity of one task execution, handed to the hooks. Carries its own start timestamp.
#[derive(Clone, Copy, Debug)]
pub struct TaskRun {
    pub id: u64,
    /// Worker index, or `None` when the submitting thread ran the task (backpressure).
    pub worker: Option<usize>,
    pub started: Instant,
}

impl TaskRun {
    pub fn runner(&self) -> String {
        match self.worker {
            Some(w) => format!("worker-{w}"),
            None => "caller".to_string(),
        }
    }
}

/// Callbacks around task execution. Panics raised by a hook are caught by the pool and never
/// reach the task's result.
pub trait TaskHooks: Send + Sync {
    /// A task was accepted by `submit`.
    fn on_submit(&self, _id: u64) {}

    fn before_execute(&self, _run: &TaskRun) {}

    fn after_execute(&self, _run: &TaskRun, _elapsed: Duration) {}

    /// All workers have exited after `shutdown`.
    fn terminated(&self) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default)]
pub struct NoHooks;

impl TaskHooks for NoHooks {}

/// Counters kept by [`TimingHooks`]. Reporting only.
#[derive(Debug, Default)]
pub struct TimingStats {
    tasks: AtomicU64,
    busy_nanos: AtomicU64,
    started_at: OnceLock<Instant>,
    total_elapsed_nanos: AtomicU64,
    terminated: AtomicBool,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks that finished (including ones that failed or panicked).
    pub fn tasks_executed(&self) -> u64 {
        self.tasks.load(Ordering::Relaxed)
    }

    /// Sum of per-task wall time across all runners.
    pub fn busy_time(&self) -> Duration {
        Duration::from_nanos(self.busy_nanos.load(Ordering::Relaxed))
    }

    /// Time of the first submission, if any.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at.get().copied()
    }

    /// Pool lifetime from first submission to termination; `None` until terminated.
    pub fn total_elapsed(&self) -> Option<Duration> {
        self.terminated
            .load(Ordering::Acquire)
            .then(|| Duration::from_nanos(self.total_elapsed_nanos.load(Ordering::Relaxed)))
    }

    /// Mean per-task wall time.
    pub fn mean_task_time(&self) -> Option<Duration> {
        let n = self.tasks_executed();
        (n > 0).then(|| Duration::from_nanos(self.busy_nanos.load(Ordering::Relaxed) / n))
    }
}

/// [`TaskHooks`] that fill a shared [`TimingStats`].
pub struct TimingHooks {
    stats: Arc<TimingStats>,
}

impl TimingHooks {
    pub fn new(stats: Arc<TimingStats>) -> Self {
        Self { stats }
    }
}

impl TaskHooks for TimingHooks {
    fn on_submit(&self, _id: u64) {
        let _ = self.stats.started_at.get_or_init(Instant::now);
    }

    fn before_execute(&self, run: &TaskRun) {
        trace!("{}: start task {}", run.runner(), run.id);
    }

    fn after_execute(&self, run: &TaskRun, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.stats.tasks.fetch_add(1, Ordering::Relaxed);
        self.stats.busy_nanos.fetch_add(nanos, Ordering::Relaxed);
        trace!("{}: end task {}, time={}ns", run.runner(), run.id, nanos);
    }

    fn terminated(&self) {
        let total = self
            .stats
            .started_at()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        let nanos = u64::try_from(total.as_nanos()).unwrap_or(u64::MAX);
        self.stats
            .total_elapsed_nanos
            .store(nanos, Ordering::Relaxed);
        self.stats.terminated.store(true, Ordering::Release);
        info!(
            "Total time elapsed: {}ms computing {} files",
            total.as_millis(),
            self.stats.tasks_executed()
        );
    }
}
