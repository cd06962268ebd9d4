//! One unit of hashing work.

use std::path::{Path, PathBuf};

use crate::FileEntry;
use crate::engine::hashing::{Algorithm, hash_file, to_hex};
use crate::engine::tools::path_to_string;
use crate::error::CrawlResult;

/// Hash one file: `(path, algorithm, buffer_size)` → [`FileEntry`].
#[derive(Clone, Debug)]
pub struct HashTask {
    path: PathBuf,
    algorithm: Algorithm,
    buffer_size: usize,
}

impl HashTask {
    pub fn new(path: impl Into<PathBuf>, algorithm: Algorithm, buffer_size: usize) -> Self {
        Self {
            path: path.into(),
            algorithm,
            buffer_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read failures come back as [`CrawlError::Hash`](crate::CrawlError::Hash) for this file only.
    pub fn run(self) -> CrawlResult<FileEntry> {
        let digest = hash_file(&self.path, self.algorithm, self.buffer_size)?;
        Ok(FileEntry::new(path_to_string(&self.path), to_hex(&digest)))
    }
}
