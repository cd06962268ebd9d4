//! Crawl state tracked by the orchestrator.

use std::fmt;

/// Lifecycle of one [`Crawler::execute`](super::Crawler::execute) call.
///
/// `Idle → Traversing → Draining → Done`, or `Traversing → Draining → Failed` when the walk stops
/// early (already-submitted work is still drained before `Failed`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrawlState {
    #[default]
    Idle,
    Traversing,
    Draining,
    Done,
    Failed,
}

impl CrawlState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CrawlState::Done | CrawlState::Failed)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CrawlState::Idle => "idle",
            CrawlState::Traversing => "traversing",
            CrawlState::Draining => "draining",
            CrawlState::Done => "done",
            CrawlState::Failed => "failed",
        };
        f.write_str(s)
    }
}
