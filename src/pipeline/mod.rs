//! Pipeline components: walk, orchestration, crawl state, failure handling.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod walk;

pub use context::CrawlState;
pub use error_handler::{check_for_failed_files, describe_failure};
pub use orchestrator::Crawler;
pub use walk::{
    WalkOpts, WalkOutcome, run_walk_loop, to_outcome_jwalk, to_outcome_walkdir, walk_files,
};
