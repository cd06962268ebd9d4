use log::{debug, warn};

use crate::error::{CrawlError, CrawlResult};
use crate::{CrawlOpts, CrawlReport};

/// Path and message for a per-file failure drained from the collector.
pub fn describe_failure(err: &CrawlError) -> (String, String) {
    match err {
        CrawlError::Hash { path, source } => (path.display().to_string(), source.to_string()),
        other => ("<unknown>".to_string(), other.to_string()),
    }
}

/// Check drained failures after a complete crawl: strict turns the first one into the crawl's
/// error; otherwise they are logged and left in the report.
pub fn check_for_failed_files(
    opts: &CrawlOpts,
    report: &CrawlReport,
    first_failure: Option<CrawlError>,
) -> CrawlResult<()> {
    let failed = report.failures.len();
    if opts.strict
        && let Some(first) = first_failure
    {
        return Err(CrawlError::FilesFailed {
            failed,
            first: Box::new(first),
        });
    }
    if failed > 0 {
        warn!("{} file(s) could not be hashed", failed);
        for (path, msg) in &report.failures {
            debug!("  failed: {}: {}", path, msg);
        }
    }
    Ok(())
}
