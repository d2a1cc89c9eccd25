//! Bounded thread pool for the tasks of one row.
//!
//! Tasks are fed in inner batches; each batch runs on at most `workers`
//! threads pulling from a shared queue and is joined before the next one
//! starts. A panic in one task becomes that task's failure.

mod status;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::CrawlConfig;
use crate::control::CancelToken;
use crate::fetch::{FetchOutcome, Fetcher};
use crate::task::DownloadTask;

pub use status::DownloadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub workers: usize,
    pub inner_batch_size: usize,
    pub batch_pause: Duration,
}

impl PoolSettings {
    pub fn from_config(cfg: &CrawlConfig) -> Self {
        Self {
            workers: cfg.workers_per_process,
            inner_batch_size: cfg.inner_batch_size,
            batch_pause: Duration::from_millis(cfg.batch_pause_ms),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&CrawlConfig::default())
    }
}

/// Run every task and aggregate the results. Blocks until all started tasks
/// have finished. After `cancel` fires no new task starts; the rest are
/// counted in `DownloadStatus::cancelled`.
pub fn download_all<F: Fetcher>(
    tasks: &[DownloadTask],
    settings: &PoolSettings,
    fetcher: &F,
    cancel: &CancelToken,
) -> DownloadStatus {
    let mut status = DownloadStatus::default();
    let batch_size = settings.inner_batch_size.max(1);
    let batches: Vec<&[DownloadTask]> = tasks.chunks(batch_size).collect();

    for (i, batch) in batches.iter().enumerate() {
        if cancel.is_cancelled() {
            status.cancelled += batches[i..].iter().map(|b| b.len()).sum::<usize>();
            break;
        }
        run_batch(batch, settings.workers, fetcher, cancel, &mut status);

        let last = i + 1 == batches.len();
        if !last && !settings.batch_pause.is_zero() {
            cancel.wait(settings.batch_pause);
        }
    }
    status
}

fn run_batch<F: Fetcher>(
    batch: &[DownloadTask],
    workers: usize,
    fetcher: &F,
    cancel: &CancelToken,
    status: &mut DownloadStatus,
) {
    let work: Mutex<VecDeque<&DownloadTask>> = Mutex::new(batch.iter().collect());
    let num_workers = workers.max(1).min(batch.len());
    let (tx, rx) = mpsc::channel::<(&DownloadTask, Result<FetchOutcome, String>)>();

    std::thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let work = &work;
            s.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let task = match work.lock().unwrap_or_else(PoisonError::into_inner).pop_front() {
                    Some(t) => t,
                    None => break,
                };
                let res = run_guarded(fetcher, task);
                if tx.send((task, res)).is_err() {
                    break;
                }
            });
        }
        drop(tx);
    });

    let mut finished = 0;
    for (task, res) in rx {
        finished += 1;
        status.record(task, res);
    }
    status.cancelled += batch.len() - finished;
}

fn run_guarded<F: Fetcher>(fetcher: &F, task: &DownloadTask) -> Result<FetchOutcome, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch(task))) {
        Ok(res) => res.map_err(|e| e.to_string()),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(url = %task.url, "download task panicked: {}", msg);
            Err(format!("panicked: {}", msg))
        }
    }
}
