//! Process-pool coordinator for one batch.
//!
//! Rows that already succeeded are skipped, the rest are partitioned into
//! chunks and each chunk runs in its own worker process (at most
//! `processes` at once). The coordinator is the only writer of the batch's
//! progress file: every successful row event is merged and saved before the
//! next event is handled. A worker that crashes loses only the rows it had
//! not reported yet; its siblings are unaffected. Failed chunks are not
//! re-assigned within a run.

mod spawn;

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::CrawlConfig;
use crate::control::CancelToken;
use crate::lock::sweep_lock_artifacts;
use crate::partition::{partition, Chunk};
use crate::progress::{is_done, ProgressMap, ProgressStore};
use crate::rows::Row;
use crate::stats::Stats;
use crate::worker::{RowState, WorkerEvent, WorkerJob, WorkerSettings};

use spawn::{drive_worker, spawn_worker, ChunkMessage};
pub use spawn::WorkerCommand;

/// How often the coordinator checks the cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip rows the progress file marks as successful.
    pub resume: bool,
    /// Bypass per-destination locks (manual re-runs).
    pub retry_mode: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            resume: true,
            retry_mode: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub source: PathBuf,
    pub rows_total: usize,
    /// Already successful in the progress file.
    pub rows_skipped: usize,
    pub rows_succeeded: usize,
    pub rows_failed: usize,
    /// Chunks whose worker crashed, aborted, or could not be started.
    pub chunks_failed: usize,
    pub stats: Stats,
    pub cancelled: bool,
}

#[derive(Default)]
struct ChunkState {
    finished: bool,
    aborted: Option<String>,
    stats: Stats,
}

pub struct Coordinator {
    settings: WorkerSettings,
    processes: usize,
    chunk_size: usize,
    resume: bool,
    auth_artifact: PathBuf,
    worker: WorkerCommand,
}

impl Coordinator {
    pub fn new(cfg: &CrawlConfig, options: RunOptions, auth_artifact: PathBuf, worker: WorkerCommand) -> Self {
        Self {
            settings: WorkerSettings::from_config(cfg, options.retry_mode),
            processes: cfg.process_count(),
            chunk_size: cfg.chunk_size,
            resume: options.resume,
            auth_artifact,
            worker,
        }
    }

    /// Run every pending row of `source`. Returns once all started workers
    /// have exited.
    pub async fn run_batch(&self, source: &Path, rows: Vec<Row>, cancel: &CancelToken) -> Result<BatchReport> {
        let store = ProgressStore::for_source(source);
        let mut progress = if self.resume {
            store.load()?
        } else {
            ProgressMap::new()
        };

        let mut report = BatchReport {
            source: source.to_path_buf(),
            rows_total: rows.len(),
            ..BatchReport::default()
        };
        let pending: Vec<Row> = rows
            .into_iter()
            .filter(|r| !(self.resume && is_done(&progress, r.index)))
            .collect();
        report.rows_skipped = report.rows_total - pending.len();

        let chunks = partition(pending, self.chunk_size);
        tracing::info!(
            source = %source.display(),
            rows = report.rows_total,
            skipped = report.rows_skipped,
            chunks = chunks.len(),
            processes = self.processes,
            "starting batch"
        );

        let mut queue: VecDeque<Chunk> = chunks.into();
        let mut states: HashMap<usize, ChunkState> = HashMap::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ChunkMessage)>();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut join_set = JoinSet::new();
        let mut running = 0usize;
        let mut interrupted = false;
        let mut ticker = tokio::time::interval(CANCEL_POLL);

        loop {
            while !interrupted && running < self.processes {
                let Some(chunk) = queue.pop_front() else {
                    break;
                };
                let chunk_id = chunk.id;
                let child = match spawn_worker(&self.worker) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!(chunk = chunk_id, "{:#}", e);
                        report.chunks_failed += 1;
                        continue;
                    }
                };
                tracing::debug!(chunk = chunk_id, rows = chunk.rows.len(), pid = ?child.id(), "worker spawned");
                states.insert(chunk_id, ChunkState::default());
                let job = WorkerJob {
                    chunk,
                    auth_artifact: self.auth_artifact.clone(),
                    settings: self.settings.clone(),
                };
                join_set.spawn(drive_worker(child, job, tx.clone(), stop_rx.clone()));
                running += 1;
            }

            if running == 0 && (queue.is_empty() || interrupted) {
                break;
            }

            tokio::select! {
                Some((chunk_id, msg)) = rx.recv() => {
                    let state = states.entry(chunk_id).or_default();
                    match msg {
                        ChunkMessage::Event(WorkerEvent::Row(row)) => match row.state {
                            RowState::Succeeded => {
                                report.rows_succeeded += 1;
                                if let Some(record) = row.record {
                                    for f in &record.files {
                                        state.stats.record_file(f);
                                    }
                                    progress.insert(row.index, record);
                                    store
                                        .save(&progress)
                                        .with_context(|| format!("save progress for row {}", row.index))?;
                                }
                            }
                            RowState::Failed => report.rows_failed += 1,
                            RowState::Cancelled => {}
                        },
                        ChunkMessage::Event(WorkerEvent::Finished { rows }) => {
                            tracing::debug!(chunk = chunk_id, rows, "chunk finished");
                            state.finished = true;
                        }
                        ChunkMessage::Event(WorkerEvent::Aborted { reason }) => {
                            tracing::warn!(chunk = chunk_id, "chunk aborted: {}", reason);
                            state.aborted = Some(reason);
                        }
                        ChunkMessage::Exited { success, detail } => {
                            running -= 1;
                            if !state.finished || state.aborted.is_some() || !success {
                                tracing::warn!(chunk = chunk_id, status = %detail, "worker did not complete its chunk");
                                report.chunks_failed += 1;
                            }
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !interrupted && cancel.is_cancelled() {
                        interrupted = true;
                        tracing::info!(
                            running,
                            unstarted = queue.len(),
                            "interrupt: no new chunks, stopping workers"
                        );
                        let _ = stop_tx.send(true);
                    }
                }
            }
        }

        while join_set.join_next().await.is_some() {}

        report.stats = states.into_values().map(|s| s.stats).sum();
        report.cancelled = interrupted || cancel.is_cancelled();
        if report.cancelled {
            let root = self.settings.downloads_dir.clone();
            match tokio::task::spawn_blocking(move || sweep_lock_artifacts(&root)).await {
                Ok(Ok(n)) => tracing::info!(removed = n, "lock sweep after interrupt"),
                Ok(Err(e)) => tracing::warn!("lock sweep failed: {}", e),
                Err(e) => tracing::warn!("lock sweep task failed: {}", e),
            }
        }

        tracing::info!(
            source = %source.display(),
            succeeded = report.rows_succeeded,
            failed = report.rows_failed,
            chunks_failed = report.chunks_failed,
            files = report.stats.total,
            "batch done"
        );
        Ok(report)
    }
}
