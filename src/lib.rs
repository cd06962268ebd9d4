//! hashcrawl: walk a directory tree, hash every regular file on a bounded worker pool, and collect
//! a path → digest map.
//!
//! The pieces can be used on their own: [`engine::BoundedWorkerPool`] (caller-runs backpressure),
//! [`engine::CompletionCollector`] (results in completion order) and [`Crawler`] (walk + drain).

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{CrawlError, CrawlResult};
pub use pipeline::{CrawlState, Crawler};
pub use types::*;

use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Single entry point: crawl `root` with `opts` on a fresh pool, shut the pool down, and return
/// `(path → digest, report)`.
///
/// For repeated crawls on one pool, or to cancel from another thread, use [`Crawler`] directly.
pub fn crawl_dir(
    root: &Path,
    opts: &CrawlOpts,
) -> CrawlResult<(HashMap<String, String>, CrawlReport)> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    let mut crawler = Crawler::new(root, opts.clone())?;
    let results = ResultMap::new();
    let outcome = crawler.execute(&results);
    crawler.quit();
    let report = outcome?;
    Ok((results.into_inner(), report))
}
