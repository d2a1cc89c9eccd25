//! RAII guard: removes the lock artifact, then releases the lock.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::PoisonError;

use super::Registry;

/// Held lock on one destination. Released on every exit path, including
/// unwinding out of a panicking task.
pub struct LockGuard {
    path: PathBuf,
    file: Option<File>,
    registry: Registry,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf, file: File, registry: Registry) -> Self {
        Self {
            path,
            file: Some(file),
            registry,
        }
    }

    /// Path of the lock artifact (`<destination>.lock`).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Unlink while still holding the lock; a waiter that opened the old
        // inode re-checks the path after locking and starts over.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), "remove lock artifact: {}", e);
            }
        }
        drop(self.file.take());
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("path", &self.path).finish()
    }
}
