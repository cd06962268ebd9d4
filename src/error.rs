//! Error types for hashcrawl
//!
//! Two failure scopes matter during a crawl:
//! - per-file failures ([`CrawlError::Hash`], [`CrawlError::TaskPanicked`]) travel inside the
//!   result channel and only surface when that file's result is taken from the collector
//! - crawl-level failures ([`CrawlError::Traversal`], [`CrawlError::Cancelled`]) stop submission
//!   immediately and end up wrapped in [`CrawlError::Incomplete`] once in-flight work is drained

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// Root or a subdirectory could not be read during the walk
    #[error("traversal failed at {}: {message}", display_opt_path(.path))]
    Traversal {
        path: Option<PathBuf>,
        message: String,
    },

    /// A single file could not be opened or read mid-stream
    #[error("failed to hash {}: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Submission after `shutdown()`
    #[error("worker pool is shut down")]
    PoolShutdown,

    /// A task panicked; the worker that ran it survives
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("crawl cancelled")]
    Cancelled,

    /// The walk stopped early. Work submitted before the stop was drained into the output map.
    #[error("crawl incomplete ({collected}/{submitted} results collected): {source}")]
    Incomplete {
        submitted: usize,
        collected: usize,
        #[source]
        source: Box<CrawlError>,
    },

    /// Strict mode: the first per-file failure of an otherwise complete crawl
    #[error("{failed} file(s) failed to hash, first: {first}")]
    FilesFailed { failed: usize, first: Box<CrawlError> },
}

fn display_opt_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown path>".to_string())
}

/// Result alias for library operations that fail with [`CrawlError`]
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
