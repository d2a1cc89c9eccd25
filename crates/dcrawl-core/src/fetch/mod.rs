//! Download executor: one task → one file, locked, staged and renamed.

mod http;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::lock::{LockError, LockManager};
use crate::storage::StagedFile;
use crate::task::DownloadTask;

pub use http::{HttpClient, PageResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { bytes: u64 },
    /// Destination already on disk; no network I/O happened.
    AlreadyPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Http(u32),
    #[error("transport: {0}")]
    Transport(String),
    #[error("timed out waiting for lock {}", .0.display())]
    LockTimeout(PathBuf),
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    #[error("interrupted")]
    Cancelled,
}

impl From<LockError> for FetchError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Timeout { path, .. } => FetchError::LockTimeout(path),
            LockError::Io { source, .. } => FetchError::Storage(source),
            LockError::Cancelled { .. } => FetchError::Cancelled,
        }
    }
}

/// Anything that can carry out a [`DownloadTask`]. The pool only needs this.
pub trait Fetcher: Sync {
    fn fetch(&self, task: &DownloadTask) -> Result<FetchOutcome, FetchError>;

    /// `(success, error)`; already-present counts as success.
    fn fetch_tracked(&self, task: &DownloadTask) -> (bool, Option<String>) {
        match self.fetch(task) {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }
}

/// Fetches documents over HTTP with the current session headers.
pub struct Executor {
    http: HttpClient,
    headers: HashMap<String, String>,
    locks: LockManager,
    lock_timeout: Duration,
}

impl Executor {
    pub fn new(http: HttpClient, locks: LockManager, lock_timeout: Duration) -> Self {
        Self {
            http,
            headers: HashMap::new(),
            locks,
            lock_timeout,
        }
    }

    /// Replace the request headers (cookies after a session refresh).
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }
}

impl Fetcher for Executor {
    fn fetch(&self, task: &DownloadTask) -> Result<FetchOutcome, FetchError> {
        std::fs::create_dir_all(&task.folder)?;
        let dest = task.destination();
        if dest.exists() {
            tracing::debug!(path = %dest.display(), "already present");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let _guard = if task.retry_mode {
            None
        } else {
            Some(self.locks.acquire(&dest, self.lock_timeout)?)
        };
        // Another holder may have finished while we waited.
        if dest.exists() {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let mut staged = StagedFile::create(&task.folder, &task.filename)?;
        let code = self.http.download(&task.url, &self.headers, &mut staged)?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        staged.sync()?;
        let bytes = staged.bytes_written();
        staged.finalize(&dest)?;
        tracing::debug!(url = %task.url, path = %dest.display(), bytes, "downloaded");
        Ok(FetchOutcome::Downloaded { bytes })
    }
}
