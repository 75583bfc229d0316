//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects beyond
//! `canonicalize`.

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with `base` if relative
#[inline]
pub fn normalize_path(path: &Path, base: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    })
}

/// Directory containing `path`, or `path` itself when it has no parent.
#[inline]
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
}

/// Check whether the final extension of `name` is one of `exts` (without dot).
pub fn has_extension(name: &str, exts: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| exts.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
