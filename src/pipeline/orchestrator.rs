use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::engine::collector::CompletionCollector;
use crate::engine::pool::{BoundedWorkerPool, PoolStats};
use crate::engine::progress::{drain_bar, finish_progress, report_drained};
use crate::engine::task::HashTask;
use crate::engine::timing::{TimingHooks, TimingStats};
use crate::error::{CrawlError, CrawlResult};
use crate::pipeline::context::CrawlState;
use crate::pipeline::error_handler::{check_for_failed_files, describe_failure};
use crate::pipeline::walk::{WalkOpts, walk_files};
use crate::{CrawlOpts, CrawlReport, FileEntry, ResultMap};

/// Runs crawls of one root on one pool: walk → one [`HashTask`] per file → drain into a [`ResultMap`].
///
/// The pool outlives individual crawls; `execute` can be called again until [`quit`](Self::quit).
pub struct Crawler {
    root: PathBuf,
    opts: CrawlOpts,
    collector: CompletionCollector<FileEntry>,
    timing: Arc<TimingStats>,
    submitted: usize,
    cancel: Arc<AtomicBool>,
    state: Mutex<CrawlState>,
}

impl Crawler {
    /// Validate `opts` and start the (empty) worker pool.
    pub fn new(root: impl Into<PathBuf>, opts: CrawlOpts) -> CrawlResult<Self> {
        if opts.buffer_size == 0 {
            return Err(CrawlError::InvalidConfig("buffer_size must be > 0".into()));
        }
        let timing = Arc::new(TimingStats::new());
        let hooks = Arc::new(TimingHooks::new(Arc::clone(&timing)));
        let pool = Arc::new(BoundedWorkerPool::with_hooks(opts.pool.clone(), hooks)?);
        Ok(Self {
            root: root.into(),
            opts,
            collector: CompletionCollector::new(pool),
            timing,
            submitted: 0,
            cancel: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(CrawlState::Idle),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn opts(&self) -> &CrawlOpts {
        &self.opts
    }

    pub fn state(&self) -> CrawlState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: CrawlState) {
        debug!("crawl state -> {}", state);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Tasks submitted by the last (or current) walk.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Flag checked between walk entries. Set it (e.g. from a Ctrl+C handler) to stop the walk.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Set when the last crawl was cancelled or hit a traversal failure.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn timing(&self) -> &TimingStats {
        &self.timing
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.collector.pool().stats()
    }

    /// Crawl the root and insert one `(path, digest)` per regular file into `out`.
    ///
    /// Per-file hash failures are drained like any other result: logged, listed in the report,
    /// and fatal only in strict mode. If the walk itself fails or is cancelled, submission stops,
    /// the tasks already submitted are still drained into `out`, the cancel flag is set and
    /// [`CrawlError::Incomplete`] is returned.
    pub fn execute(&mut self, out: &ResultMap) -> CrawlResult<CrawlReport> {
        let started = Instant::now();
        if self.collector.pool().is_shutdown() {
            return Err(CrawlError::PoolShutdown);
        }
        self.cancel.store(false, Ordering::Relaxed);
        self.submitted = 0;
        self.set_state(CrawlState::Traversing);
        debug!("Crawling {} with {}", self.root.display(), self.opts.algorithm);

        let walk_opts = WalkOpts {
            follow_links: self.opts.follow_links,
            parallel: self.opts.parallel_walk,
        };
        let algorithm = self.opts.algorithm;
        let buffer_size = self.opts.buffer_size;
        let collector = &self.collector;
        let mut submitted = 0_usize;
        let walked = walk_files(&self.root, &walk_opts, &self.cancel, |path| {
            let task = HashTask::new(path, algorithm, buffer_size);
            collector.submit(move || task.run())?;
            submitted += 1;
            Ok(())
        });
        // Walk has returned: the count below is final.
        self.submitted = submitted;

        self.set_state(CrawlState::Draining);
        let mut report = CrawlReport {
            submitted,
            ..CrawlReport::default()
        };
        let first_failure = self.drain(submitted, out, &mut report);
        report.elapsed = started.elapsed();

        if let Err(source) = walked {
            self.cancel.store(true, Ordering::Relaxed);
            self.set_state(CrawlState::Failed);
            warn!(
                "Crawl of {} stopped early: {} ({} results collected)",
                self.root.display(),
                source,
                report.succeeded()
            );
            return Err(CrawlError::Incomplete {
                submitted,
                collected: report.succeeded(),
                source: Box::new(source),
            });
        }

        self.set_state(CrawlState::Done);
        info!(
            "Hashed {} of {} files in {:?}",
            report.succeeded(),
            report.submitted,
            report.elapsed
        );
        check_for_failed_files(&self.opts, &report, first_failure)?;
        Ok(report)
    }

    /// Take exactly `count` results. Returns the first per-file failure, if any.
    fn drain(
        &self,
        count: usize,
        out: &ResultMap,
        report: &mut CrawlReport,
    ) -> Option<CrawlError> {
        let bar = drain_bar(self.opts.show_progress, count);
        let mut first_failure = None;
        for _ in 0..count {
            match self.collector.take() {
                Ok(entry) => {
                    out.insert(entry);
                }
                Err(err) => {
                    let (path, msg) = describe_failure(&err);
                    warn!("{}: {}", path, msg);
                    report.failures.push((path, msg));
                    first_failure.get_or_insert(err);
                }
            }
            report.collected += 1;
            report_drained(bar.as_ref(), report.collected);
        }
        finish_progress(bar.as_ref(), report.collected);
        first_failure
    }

    /// Shut the pool down. Safe to call more than once.
    pub fn quit(&self) {
        self.collector.pool().shutdown();
    }
}
