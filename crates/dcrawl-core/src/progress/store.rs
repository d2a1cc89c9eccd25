//! `<source>.progress` JSON file with atomic full overwrite.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::ProgressMap;

pub const PROGRESS_SUFFIX: &str = ".progress";

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("progress file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("progress file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for a batch source file: `<source>.progress`.
    pub fn for_source(source: &Path) -> Self {
        let mut o = source.as_os_str().to_owned();
        o.push(PROGRESS_SUFFIX);
        Self::new(PathBuf::from(o))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ProgressError {
        ProgressError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Empty map if the file does not exist. A file that does not parse is
    /// an error, never silently replaced.
    pub fn load(&self) -> Result<ProgressMap, ProgressError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProgressMap::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if data.trim().is_empty() {
            return Ok(ProgressMap::new());
        }
        serde_json::from_str(&data).map_err(|source| ProgressError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the whole mapping: sibling temp file, `sync_all`, rename.
    /// A crash at any point leaves either the old or the new file.
    pub fn save(&self, map: &ProgressMap) -> Result<(), ProgressError> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(map).map_err(|source| ProgressError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".progress-")
            .tempfile_in(dir)
            .map_err(|e| self.io_err(e))?;
        tmp.write_all(&json).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        tracing::trace!(path = %self.path.display(), rows = map.len(), "progress saved");
        Ok(())
    }
}
