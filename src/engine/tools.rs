//! Path utilities

use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Path as a map key, exactly as the walk produced it (lossy for non-UTF-8 names).
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Render a result key for output: relative to `root` when asked and possible, with `/` separators.
pub fn display_key(key: &str, root: &Path, relative: bool) -> String {
    let path = Path::new(key);
    let shown = if relative {
        path_relative_to(path, root).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    };
    path_to_string(&shown).replace('\\', "/")
}
