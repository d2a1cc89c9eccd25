//! Per-row aggregation of task results.

use std::path::PathBuf;

use crate::fetch::FetchOutcome;
use crate::task::DownloadTask;

/// What happened to the tasks of one row attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadStatus {
    /// `(url, destination)` for every file now on disk.
    pub successful: Vec<(String, PathBuf)>,
    /// `(url, error)`
    pub failed: Vec<(String, String)>,
    /// Successes that needed no download.
    pub already_present: usize,
    /// Tasks never started because of an interrupt.
    pub cancelled: usize,
}

impl DownloadStatus {
    pub fn any_success(&self) -> bool {
        !self.successful.is_empty()
    }

    pub fn record(&mut self, task: &DownloadTask, result: Result<FetchOutcome, String>) {
        match result {
            Ok(outcome) => {
                if outcome == FetchOutcome::AlreadyPresent {
                    self.already_present += 1;
                }
                self.successful.push((task.url.clone(), task.destination()));
            }
            Err(e) => {
                tracing::warn!(url = %task.url, path = %task.destination().display(), "download failed: {}", e);
                self.failed.push((task.url.clone(), e));
            }
        }
    }
}
