//! Application configuration constants.
//! Defaults and tuning in one place.

use std::sync::OnceLock;

// ---- Package / names (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    worker_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                worker_prefix: format!("{pkg}-worker"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory settings file read by the CLI (e.g. `.hashcrawl.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Thread name prefix for pool workers.
    pub fn worker_prefix(&self) -> &str {
        &self.worker_prefix
    }
}

// ---- Crawl defaults ----

/// Defaults for [`CrawlOpts`](crate::CrawlOpts) and [`PoolConfig`](crate::engine::PoolConfig).
pub struct CrawlDefaults;

impl CrawlDefaults {
    pub const ALGORITHM: &'static str = "MD5";
    /// Read-chunk size for hashing (bytes).
    pub const BUFFER_SIZE: usize = 2048;
    pub const CORE_WORKERS: usize = 10;
    pub const MAX_WORKERS: usize = 100;
    /// Idle time before a worker above the core count exits.
    pub const MAX_IDLE_SECS: u64 = 5;
    pub const TASK_QUEUE_CAPACITY: usize = 20;
}

// ---- Progress ----

pub struct ProgressConsts;

impl ProgressConsts {
    /// Drained results per progress bar update.
    pub const PROGRESS_UPDATE_BATCH_SIZE: usize = 100;
}
