//! Success counters per file extension, mergeable in any order.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::AddAssign;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Per-extension and total success counts. Merging is plain summation, so
/// chunk results can be folded together in whatever order they arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Lower-case extension with leading dot (`".pdf"`); `""` for none.
    pub by_extension: BTreeMap<String, u64>,
    pub total: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&mut self, path: &Path) {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        *self.by_extension.entry(ext).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn merge(&mut self, other: &Stats) {
        for (ext, n) in &other.by_extension {
            *self.by_extension.entry(ext.clone()).or_insert(0) += n;
        }
        self.total += other.total;
    }

    pub fn count(&self, ext: &str) -> u64 {
        self.by_extension.get(ext).copied().unwrap_or(0)
    }
}

impl AddAssign<&Stats> for Stats {
    fn add_assign(&mut self, rhs: &Stats) {
        self.merge(rhs);
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Self {
        iter.fold(Stats::new(), |mut acc, s| {
            acc.merge(&s);
            acc
        })
    }
}
