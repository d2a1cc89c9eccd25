//! Durable per-batch progress: row index → outcome, used to skip finished
//! rows on the next run.

mod store;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pool::DownloadStatus;

pub use store::{ProgressError, ProgressStore, PROGRESS_SUFFIX};

/// Keyed by zero-based row index; serialized with string keys.
pub type ProgressMap = BTreeMap<usize, ProgressRecord>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub url: String,
    pub success: bool,
    pub files: Vec<PathBuf>,
    /// `[url, error]` pairs for the files that did not make it.
    pub failed: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressRecord {
    /// Record for a row attempt, or `None` when nothing succeeded (such
    /// rows are not persisted and are retried on the next run).
    pub fn from_status(url: &str, status: &DownloadStatus) -> Option<Self> {
        if !status.any_success() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            success: true,
            files: status.successful.iter().map(|(_, p)| p.clone()).collect(),
            failed: status.failed.clone(),
            timestamp: Utc::now(),
        })
    }
}

pub fn is_done(map: &ProgressMap, index: usize) -> bool {
    map.get(&index).is_some_and(|r| r.success)
}
