//! Best-effort removal of lock artifacts and staging leftovers.

use std::fs;
use std::io;
use std::path::Path;

use super::LOCK_SUFFIX;
use crate::storage::STAGING_PREFIX;

/// Walk `root` and delete every `*.lock` file and staging directory.
/// Only safe when no process is downloading into `root`. Errors on single
/// entries are logged and skipped; a missing root counts as clean.
pub fn sweep_lock_artifacts(root: &Path) -> io::Result<usize> {
    if !root.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    sweep_dir(root, &mut removed)?;
    if removed > 0 {
        tracing::info!(root = %root.display(), removed, "swept lock artifacts");
    }
    Ok(removed)
}

fn sweep_dir(dir: &Path, removed: &mut usize) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "read entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %path.display(), "stat: {}", e);
                continue;
            }
        };

        if file_type.is_dir() {
            if name.starts_with(STAGING_PREFIX) {
                match fs::remove_dir_all(&path) {
                    Ok(()) => *removed += 1,
                    Err(e) => tracing::warn!(path = %path.display(), "remove staging dir: {}", e),
                }
            } else if let Err(e) = sweep_dir(&path, removed) {
                tracing::warn!(path = %path.display(), "sweep: {}", e);
            }
        } else if name.ends_with(LOCK_SUFFIX) {
            match fs::remove_file(&path) {
                Ok(()) => *removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), "remove lock artifact: {}", e),
            }
        }
    }
    Ok(())
}
