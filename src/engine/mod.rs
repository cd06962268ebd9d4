//! Engine: hashing, the worker pool and result collection, plus the CLI surface.

pub mod arg_parser;
pub mod cli;
pub mod collector;
pub mod hashing;
pub mod pool;
pub mod progress;
pub mod task;
pub mod timing;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use collector::CompletionCollector;
pub use hashing::{Algorithm, DigestState, hash_bytes, hash_file, to_hex};
pub use pool::{BoundedWorkerPool, Job, PoolConfig, PoolStats, Submission};
pub use task::HashTask;
pub use timing::{NoHooks, TaskHooks, TaskRun, TimingHooks, TimingStats};
pub use tools::{display_key, path_relative_to, path_to_string};
