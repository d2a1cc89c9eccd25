//! Runs the rows of one chunk inside a worker process.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use crate::control::CancelToken;
use crate::fetch::{Executor, HttpClient};
use crate::links::{LinkExtractor, LinkOutcome};
use crate::lock::LockManager;
use crate::partition::Chunk;
use crate::pool::{download_all, DownloadStatus, PoolSettings};
use crate::progress::ProgressRecord;
use crate::retry::{run_row, Attempt, RowOutcome, RowRetryPolicy, SessionLost};
use crate::rows::Row;
use crate::session::Session;
use crate::task::fan_out;

use super::protocol::{RowReport, RowState, WorkerSettings};

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("not logged in and login failed")]
    NotLoggedIn,
    #[error(transparent)]
    SessionLost(#[from] SessionLost),
}

/// Per-process row driver: link extraction, fan-out, pool, row retries.
pub struct ChunkRunner<S, L> {
    session: S,
    links: L,
    http: HttpClient,
    locks: LockManager,
    lock_timeout: Duration,
    pool: PoolSettings,
    policy: RowRetryPolicy,
    downloads_root: PathBuf,
    retry_mode: bool,
    cancel: CancelToken,
}

impl<S: Session, L: LinkExtractor> ChunkRunner<S, L> {
    pub fn new(session: S, links: L, settings: &WorkerSettings, cancel: CancelToken) -> Self {
        Self {
            session,
            links,
            http: HttpClient::new(&settings.http),
            locks: LockManager::with_cancel(cancel.clone()),
            lock_timeout: settings.lock_timeout(),
            pool: settings.pool(),
            policy: RowRetryPolicy::from_config(&settings.retry),
            downloads_root: settings.downloads_dir.clone(),
            retry_mode: settings.retry_mode,
            cancel,
        }
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Process the chunk's rows in order, reporting each through `on_row`.
    /// Returns how many rows were reported. Stops early on interrupt; a
    /// lost session aborts the chunk.
    pub fn run(&mut self, chunk: &Chunk, on_row: &mut dyn FnMut(RowReport)) -> Result<usize, ChunkError> {
        if !self.session.check_login() {
            tracing::info!(chunk = chunk.id, "session not valid, logging in");
            if !self.session.login() {
                return Err(ChunkError::NotLoggedIn);
            }
        }

        let mut reported = 0;
        for row in &chunk.rows {
            if self.cancel.is_cancelled() {
                tracing::info!(chunk = chunk.id, "interrupted, leaving remaining rows");
                break;
            }
            let report = self.run_one(chunk.id, row)?;
            let stop = report.state == RowState::Cancelled;
            on_row(report);
            reported += 1;
            if stop {
                break;
            }
        }
        Ok(reported)
    }

    fn run_one(&mut self, chunk_id: usize, row: &Row) -> Result<RowReport, ChunkError> {
        let ChunkRunner {
            session,
            links,
            http,
            locks,
            lock_timeout,
            pool,
            policy,
            downloads_root,
            retry_mode,
            cancel,
        } = self;
        let (links, http, locks, pool, policy, cancel) = (&*links, &*http, &*locks, &*pool, &*policy, &*cancel);
        let (downloads_root, retry_mode, lock_timeout) = (downloads_root.as_path(), *retry_mode, *lock_timeout);
        let session = RefCell::new(session);
        tracing::info!(chunk = chunk_id, row = row.index, url = %row.url, "processing row");

        let outcome = run_row(
            policy,
            cancel,
            || session.borrow_mut().login(),
            |attempt| {
                let session = session.borrow();
                let found = match links.find_document_links(&row.url, &**session) {
                    LinkOutcome::Links(l) => l,
                    LinkOutcome::AuthRequired => return Attempt::AuthRequired,
                    LinkOutcome::Error(e) => return Attempt::Failed(e),
                };
                if found.is_empty() {
                    return Attempt::Terminal("no document links found".to_string());
                }
                let tasks = fan_out(row, &found, downloads_root, retry_mode);
                let executor =
                    Executor::new(http.clone(), locks.clone(), lock_timeout).with_headers(session.headers());
                drop(session);
                tracing::debug!(row = row.index, attempt, tasks = tasks.len(), "downloading");

                let status = download_all(&tasks, pool, &executor, cancel);
                if status.cancelled > 0 || (cancel.is_cancelled() && !status.any_success()) {
                    Attempt::Cancelled
                } else if status.any_success() {
                    Attempt::Done(status)
                } else {
                    Attempt::Failed(describe_failure(&status))
                }
            },
        )?;

        let report = match outcome {
            RowOutcome::Succeeded { value, attempts } => {
                tracing::info!(
                    row = row.index,
                    attempts,
                    files = value.successful.len(),
                    already_present = value.already_present,
                    failed = value.failed.len(),
                    "row succeeded"
                );
                RowReport {
                    index: row.index,
                    url: row.url.clone(),
                    state: RowState::Succeeded,
                    attempts,
                    reason: None,
                    record: ProgressRecord::from_status(&row.url, &value),
                }
            }
            RowOutcome::Failed { reason, attempts } => {
                tracing::warn!(row = row.index, attempts, "row failed: {}", reason);
                RowReport {
                    index: row.index,
                    url: row.url.clone(),
                    state: RowState::Failed,
                    attempts,
                    reason: Some(reason),
                    record: None,
                }
            }
            RowOutcome::Cancelled => RowReport {
                index: row.index,
                url: row.url.clone(),
                state: RowState::Cancelled,
                attempts: 0,
                reason: None,
                record: None,
            },
        };
        Ok(report)
    }
}

fn describe_failure(status: &DownloadStatus) -> String {
    match status.failed.first() {
        Some((url, err)) if status.failed.len() == 1 => format!("{}: {}", url, err),
        Some((url, err)) => format!("{} downloads failed, first {}: {}", status.failed.len(), url, err),
        None => "no downloads attempted".to_string(),
    }
}
