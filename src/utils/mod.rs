pub mod config;
pub mod fd_limit;
pub mod hashcrawl_toml;
pub mod logger;

pub use config::*;
pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use hashcrawl_toml::{HashcrawlToml, apply_file_to_opts, load_hashcrawl_toml};
pub use logger::{level_for_verbosity, setup_logging};
