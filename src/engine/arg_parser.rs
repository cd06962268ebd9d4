use clap::{ArgAction, Parser};
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Hash every file under a directory on a bounded worker pool.
///
/// Settings come from defaults, then `.hashcrawl.toml` in DIR, then these flags.
#[derive(Clone, Parser)]
#[command(name = "hashcrawl")]
#[command(about = "Hash every regular file under DIR and print <digest>  <path> lines.")]
pub struct Cli {
    /// Directory to crawl. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Digest algorithm: MD5, SHA-1 (or SHA), SHA-224, SHA-256, SHA-384, SHA-512, BLAKE3.
    #[arg(long, short = 'a')]
    pub algorithm: Option<String>,

    /// Read-chunk size in bytes.
    #[arg(long, short = 'b')]
    pub buffer_size: Option<usize>,

    /// Core worker count (always kept alive).
    #[arg(long)]
    pub core: Option<usize>,

    /// Maximum worker count. Capped by the open-file limit.
    #[arg(long)]
    pub max: Option<usize>,

    /// Seconds an extra worker may sit idle before it exits.
    #[arg(long)]
    pub idle: Option<u64>,

    /// Task queue capacity. When full and at --max workers, the walk thread hashes the file itself.
    #[arg(long)]
    pub queue: Option<usize>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Read directories in parallel.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Strict mode: exit with an error if any file fails to hash.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Print paths relative to DIR.
    #[arg(long, short = 'r')]
    pub relative: bool,

    /// Write a JSON object {path: digest} instead of text lines.
    #[arg(long)]
    pub json: bool,

    /// Write results to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Verbose output (-v debug + progress bar, -vv per-task timing).
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}
