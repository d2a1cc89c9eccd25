//! Cross-process, per-destination mutual exclusion.
//!
//! The artifact for a destination `D` is the side file `D.lock`. A
//! [`LockGuard`] owns it for the duration of one fetch; dropping the guard
//! removes the side file and releases the lock. The [`LockManager`] keeps
//! a registry of the paths it currently holds so an interrupted worker can
//! release them explicitly instead of relying on a tree sweep.

mod guard;
mod sweep;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod portable;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::control::CancelToken;

pub use guard::LockGuard;
pub use sweep::sweep_lock_artifacts;

/// Suffix appended to a destination path to form its lock artifact.
pub const LOCK_SUFFIX: &str = ".lock";

/// Interval between non-blocking lock attempts.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("timed out after {waited:?} waiting for lock {}", path.display())]
    Timeout { path: PathBuf, waited: Duration },
    #[error("lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("interrupted while waiting for lock {}", path.display())]
    Cancelled { path: PathBuf },
}

/// `<destination>.lock`
pub fn lock_path(destination: &Path) -> PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(LOCK_SUFFIX);
    PathBuf::from(o)
}

pub(crate) type Registry = Arc<Mutex<HashSet<PathBuf>>>;

/// Hands out [`LockGuard`]s and tracks which lock artifacts are held.
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct LockManager {
    held: Registry,
    cancel: Option<CancelToken>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits on `cancel` between polls so an interrupt aborts the wait.
    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self {
            held: Registry::default(),
            cancel: Some(cancel),
        }
    }

    /// Acquire the lock for `destination`, waiting at most `timeout` for
    /// another holder (thread or process) to release it.
    pub fn acquire(&self, destination: &Path, timeout: Duration) -> Result<LockGuard, LockError> {
        let path = lock_path(destination);
        let start = Instant::now();
        loop {
            if let Some(handle) = try_lock(&path)? {
                self.held
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(path.clone());
                tracing::trace!(path = %path.display(), "lock acquired");
                return Ok(LockGuard::new(path, handle, Arc::clone(&self.held)));
            }

            let waited = start.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout { path, waited });
            }
            let nap = POLL_INTERVAL.min(timeout - waited);
            let cancelled = match &self.cancel {
                Some(token) => token.wait(nap),
                None => {
                    std::thread::sleep(nap);
                    false
                }
            };
            if cancelled {
                return Err(LockError::Cancelled { path });
            }
        }
    }

    /// Lock artifacts currently held through this manager.
    pub fn held(&self) -> Vec<PathBuf> {
        let mut v: Vec<PathBuf> = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        v.sort();
        v
    }

    /// Remove the side files of every held lock. Used on interrupt; guards
    /// dropped afterwards find their artifact already gone. Returns how many
    /// artifacts were removed.
    pub fn release_held(&self) -> usize {
        let paths: Vec<PathBuf> = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        let mut removed = 0;
        for p in paths {
            match std::fs::remove_file(&p) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %p.display(), "release lock artifact: {}", e),
            }
        }
        removed
    }
}

#[cfg(unix)]
fn try_lock(path: &Path) -> Result<Option<std::fs::File>, LockError> {
    unix::try_lock(path).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(unix))]
fn try_lock(path: &Path) -> Result<Option<std::fs::File>, LockError> {
    portable::try_lock(path).map_err(|source| LockError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("downloads/Tax/2022/a.pdf")),
            Path::new("downloads/Tax/2022/a.pdf.lock")
        );
    }

    #[test]
    fn guard_drop_removes_artifact_and_registry_entry() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        let mgr = LockManager::new();
        {
            let _g = mgr.acquire(&dest, Duration::from_secs(1)).unwrap();
            assert!(lock_path(&dest).exists());
            assert_eq!(mgr.held(), vec![lock_path(&dest)]);
        }
        assert!(!lock_path(&dest).exists());
        assert!(mgr.held().is_empty());
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        let mgr = LockManager::new();
        let _g = mgr.acquire(&dest, Duration::from_secs(1)).unwrap();

        let other = LockManager::new();
        let err = other.acquire(&dest, Duration::from_millis(120)).unwrap_err();
        match err {
            LockError::Timeout { waited, .. } => assert!(waited >= Duration::from_millis(120)),
            e => panic!("expected timeout, got {e}"),
        }
    }

    #[test]
    fn waiter_gets_lock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        let mgr = LockManager::new();
        let g = mgr.acquire(&dest, Duration::from_secs(1)).unwrap();

        let dest2 = dest.clone();
        let waiter = std::thread::spawn(move || {
            LockManager::new()
                .acquire(&dest2, Duration::from_secs(5))
                .map(|_| ())
        });
        std::thread::sleep(Duration::from_millis(100));
        drop(g);
        waiter.join().unwrap().unwrap();
    }

    #[test]
    fn at_most_one_holder_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("contended.pdf");
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let mgr = LockManager::new();
                    for _ in 0..5 {
                        let _g = mgr.acquire(&dest, Duration::from_secs(10)).unwrap();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!lock_path(&dest).exists());
    }

    #[test]
    fn cancel_interrupts_wait() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        let _g = LockManager::new().acquire(&dest, Duration::from_secs(1)).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = LockManager::with_cancel(cancel)
            .acquire(&dest, Duration::from_secs(30))
            .unwrap_err();
        assert!(matches!(err, LockError::Cancelled { .. }));
    }

    #[test]
    fn release_held_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::new();
        let g1 = mgr.acquire(&dir.path().join("a.pdf"), Duration::from_secs(1)).unwrap();
        let g2 = mgr.acquire(&dir.path().join("b.doc"), Duration::from_secs(1)).unwrap();
        assert_eq!(mgr.release_held(), 2);
        assert!(mgr.held().is_empty());
        assert!(!lock_path(&dir.path().join("a.pdf")).exists());
        drop(g1);
        drop(g2);
    }
}
