//! Coordinator ⇄ worker wire format: one `WorkerJob` JSON document on the
//! child's stdin, one `WorkerEvent` JSON object per line on its stdout.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{CrawlConfig, HttpConfig, LinksConfig, RetryConfig, SessionConfig};
use crate::partition::Chunk;
use crate::pool::PoolSettings;
use crate::progress::ProgressRecord;

/// Everything a worker needs besides its rows. Workers never read the
/// config file themselves, so a run stays consistent if it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    pub workers_per_process: usize,
    pub inner_batch_size: usize,
    pub batch_pause_ms: u64,
    pub retry_mode: bool,
    pub chunk_size: usize,
    pub lock_timeout_secs: u64,
    pub retry: RetryConfig,
    pub downloads_dir: PathBuf,
    pub http: HttpConfig,
    pub session: SessionConfig,
    pub links: LinksConfig,
}

impl WorkerSettings {
    pub fn from_config(cfg: &CrawlConfig, retry_mode: bool) -> Self {
        Self {
            workers_per_process: cfg.workers_per_process,
            inner_batch_size: cfg.inner_batch_size,
            batch_pause_ms: cfg.batch_pause_ms,
            retry_mode,
            chunk_size: cfg.chunk_size,
            lock_timeout_secs: cfg.lock_timeout_secs,
            retry: cfg.retry_config(),
            downloads_dir: cfg.downloads_dir.clone(),
            http: cfg.http.clone(),
            session: cfg.session.clone(),
            links: cfg.links.clone(),
        }
    }

    pub fn pool(&self) -> PoolSettings {
        PoolSettings {
            workers: self.workers_per_process,
            inner_batch_size: self.inner_batch_size,
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerJob {
    pub chunk: Chunk,
    /// Serialized login; each worker builds its own session from it.
    pub auth_artifact: PathBuf,
    pub settings: WorkerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Succeeded,
    Failed,
    /// Interrupted before the row finished; retried on the next run.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    pub index: usize,
    pub url: String,
    pub state: RowState,
    pub attempts: u32,
    #[serde(default)]
    pub reason: Option<String>,
    /// Present when at least one file succeeded; the coordinator persists it.
    #[serde(default)]
    pub record: Option<ProgressRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkerEvent {
    Row(RowReport),
    Finished { rows: usize },
    Aborted { reason: String },
}
