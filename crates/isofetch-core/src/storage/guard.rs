//! RAII guard that removes a leftover temp file when dropped.

use std::path::{Path, PathBuf};

/// Removes the temp file on drop, whatever path the job took. After a
/// successful publish the file is already gone and the removal is a no-op.
pub struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed leftover temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "could not remove temp file: {}", e),
        }
    }
}
