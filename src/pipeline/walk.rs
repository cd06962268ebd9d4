//! Traversal: visit every entry under a root and hand each regular file to a callback, on the
//! calling thread. Serial walks use walkdir; parallel walks read directories on the rayon pool via
//! jwalk but are still consumed here, one entry at a time. Both walkers yield each directory's
//! entries sorted by file name, so a given tree is always visited in the same order.

use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CrawlError, CrawlResult};

/// Walk settings.
#[derive(Clone, Copy, Debug, Default)]
pub struct WalkOpts {
    pub follow_links: bool,
    pub parallel: bool,
}

/// One result from a directory walk: either an entry or an error with optional path.
pub enum WalkOutcome {
    Ok { path: PathBuf, file_type: FileType },
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a jwalk result into [`WalkOutcome`].
pub fn to_outcome_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            file_type: entry.file_type(),
            path: entry.path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok {
            file_type: entry.file_type(),
            path: entry.into_path(),
        },
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(root: &Path, opts: &WalkOpts) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(root)
            .follow_links(opts.follow_links)
            .skip_hidden(false)
            .sort(true)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .map(to_outcome_jwalk),
    )
}

fn walkdir_iter(root: &Path, opts: &WalkOpts) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(root)
            .follow_links(opts.follow_links)
            .sort_by_file_name()
            .into_iter()
            .map(to_outcome_walkdir),
    )
}

/// Walk `root` and call `on_file` for every regular file. Directories are always descended.
///
/// Stops at the first walk error ([`CrawlError::Traversal`]), the first `on_file` error, or when
/// `cancel` is set ([`CrawlError::Cancelled`]). Returns the number of files handed to `on_file`.
pub fn walk_files<F>(
    root: &Path,
    opts: &WalkOpts,
    cancel: &AtomicBool,
    on_file: F,
) -> CrawlResult<usize>
where
    F: FnMut(PathBuf) -> CrawlResult<()>,
{
    let iter = if opts.parallel {
        jwalk_iter(root, opts)
    } else {
        walkdir_iter(root, opts)
    };
    run_walk_loop(iter, cancel, on_file)
}

/// Common walk loop over an iterator of [`WalkOutcome`].
pub fn run_walk_loop<I, F>(iter: I, cancel: &AtomicBool, mut on_file: F) -> CrawlResult<usize>
where
    I: Iterator<Item = WalkOutcome>,
    F: FnMut(PathBuf) -> CrawlResult<()>,
{
    let mut count = 0_usize;
    for outcome in iter {
        if cancel.load(Ordering::Relaxed) {
            return Err(CrawlError::Cancelled);
        }
        match outcome {
            WalkOutcome::Ok { path, file_type } => {
                if file_type.is_file() {
                    on_file(path)?;
                    count += 1;
                }
            }
            WalkOutcome::Err { msg, path } => {
                return Err(CrawlError::Traversal { path, message: msg });
            }
        }
    }
    Ok(count)
}
