//! Load `.hashcrawl.toml` from the crawl root (CLI only). The library takes [`CrawlOpts`] directly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::CrawlOpts;
use crate::error::CrawlResult;

#[derive(Debug, Default, Deserialize)]
pub struct HashcrawlToml {
    #[serde(default)]
    settings: CrawlSection,
}

#[derive(Debug, Default, Deserialize)]
struct CrawlSection {
    algorithm: Option<String>,
    buffer_size: Option<usize>,
    core_workers: Option<usize>,
    max_workers: Option<usize>,
    max_idle_secs: Option<u64>,
    task_queue_capacity: Option<usize>,
    follow_links: Option<bool>,
    parallel_walk: Option<bool>,
    strict: Option<bool>,
}

impl HashcrawlToml {
    /// Parse settings from TOML text.
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Load the settings file from `dir` if present. Returns None if missing or unreadable.
pub fn load_hashcrawl_toml(dir: &Path, filename: &str) -> Option<HashcrawlToml> {
    let path = dir.join(filename);
    let s = std::fs::read_to_string(&path).ok()?;
    HashcrawlToml::parse(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $field:ident => $($target:ident).+) => {
        if let Some(v) = $sec.$field {
            $opts.$($target).+ = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &HashcrawlToml, opts: &mut CrawlOpts) -> CrawlResult<()> {
    let sec = &file.settings;
    if let Some(ref name) = sec.algorithm {
        opts.algorithm = name.parse()?;
    }
    apply_file_opt!(sec, opts, buffer_size => buffer_size);
    apply_file_opt!(sec, opts, core_workers => pool.core_workers);
    apply_file_opt!(sec, opts, max_workers => pool.max_workers);
    apply_file_opt!(sec, opts, task_queue_capacity => pool.task_queue_capacity);
    if let Some(secs) = sec.max_idle_secs {
        opts.pool.max_idle = Duration::from_secs(secs);
    }
    apply_file_opt!(sec, opts, follow_links => follow_links);
    apply_file_opt!(sec, opts, parallel_walk => parallel_walk);
    apply_file_opt!(sec, opts, strict => strict);
    Ok(())
}
