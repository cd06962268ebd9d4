//! Public types for the hashcrawl API: result entries, the shared output map, options and reports.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::engine::hashing::Algorithm;
use crate::engine::pool::PoolConfig;
use crate::utils::config::CrawlDefaults;

/// One completed hash: `(file_path, digest)`. Created once per finished task, never mutated.
///
/// Ordered by case-insensitive comparison on `file_path` (display order only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    file_path: String,
    digest: String,
}

impl FileEntry {
    pub fn new(file_path: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            digest: digest.into(),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn into_parts(self) -> (String, String) {
        (self.file_path, self.digest)
    }
}

fn case_insensitive_cmp(a: &str, b: &str) -> Ordering {
    let lower_a = a.chars().flat_map(char::to_lowercase);
    let lower_b = b.chars().flat_map(char::to_lowercase);
    lower_a.cmp(lower_b)
}

impl Ord for FileEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Tie-break on the raw path so Ord stays consistent with Eq.
        case_insensitive_cmp(&self.file_path, &other.file_path)
            .then_with(|| self.file_path.cmp(&other.file_path))
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl PartialOrd for FileEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Checksum-file style: `<digest>  <path>`
impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.digest, self.file_path)
    }
}

/// Map of file path → hex digest, safe to insert into from several threads.
///
/// Created empty by the caller, filled during [`Crawler::execute`](crate::Crawler::execute),
/// and complete once `execute` returns.
#[derive(Debug, Default)]
pub struct ResultMap {
    inner: Mutex<HashMap<String, String>>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock can only interrupt a single insert; the map stays usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert an entry. Returns the previous digest if the path was already present.
    pub fn insert(&self, entry: FileEntry) -> Option<String> {
        let (path, digest) = entry.into_parts();
        self.lock().insert(path, digest)
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.lock().clone()
    }

    /// Entries in case-insensitive path order.
    pub fn sorted_entries(&self) -> Vec<FileEntry> {
        let mut entries: Vec<FileEntry> = self
            .lock()
            .iter()
            .map(|(p, d)| FileEntry::new(p.clone(), d.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Path-ordered map, used for JSON output.
    pub fn to_btree(&self) -> BTreeMap<String, String> {
        self.lock()
            .iter()
            .map(|(p, d)| (p.clone(), d.clone()))
            .collect()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

/// Options for a crawl. [`Default`] matches the documented defaults
/// (MD5, 2048-byte reads, 10 core / 100 max workers, 5 s idle, queue of 20).
#[derive(Clone, Debug)]
pub struct CrawlOpts {
    /// Digest algorithm applied to every file.
    pub algorithm: Algorithm,
    /// Read-chunk size in bytes.
    pub buffer_size: usize,
    /// Worker pool sizing.
    pub pool: PoolConfig,
    /// Follow symbolic links during the walk.
    pub follow_links: bool,
    /// Read directories in parallel (jwalk). Entries are still consumed on the calling thread.
    pub parallel_walk: bool,
    /// Fail the crawl when any file fails to hash (after all results are drained).
    pub strict: bool,
    /// Show a progress bar while draining.
    pub show_progress: bool,
}

impl Default for CrawlOpts {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            buffer_size: CrawlDefaults::BUFFER_SIZE,
            pool: PoolConfig::default(),
            follow_links: false,
            parallel_walk: false,
            strict: false,
            show_progress: false,
        }
    }
}

/// Summary of one [`Crawler::execute`](crate::Crawler::execute) run.
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Tasks submitted during the walk.
    pub submitted: usize,
    /// Results drained from the collector (successes and failures).
    pub collected: usize,
    /// Per-file failures: path and message.
    pub failures: Vec<(String, String)>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn succeeded(&self) -> usize {
        self.collected - self.failures.len()
    }

    /// True when every submitted task was drained.
    pub fn is_complete(&self) -> bool {
        self.submitted == self.collected
    }
}
