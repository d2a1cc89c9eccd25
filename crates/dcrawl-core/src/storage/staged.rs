//! Temp file in a private staging dir, renamed into place on finalize.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::STAGING_PREFIX;

/// Download body being written. Dropping it without `finalize` removes the
/// staging dir and everything in it.
pub struct StagedFile {
    dir: TempDir,
    file: File,
    path: PathBuf,
    written: u64,
}

impl StagedFile {
    /// Create `<folder>/.dcrawl-staging-XXXX/<filename>`. Staging in the
    /// destination folder keeps the final rename on one filesystem.
    pub fn create(folder: &Path, filename: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(folder)?;
        let path = dir.path().join(filename);
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(&path)?;
        Ok(StagedFile {
            dir,
            file,
            path,
            written: 0,
        })
    }

    pub fn staging_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush file data to disk. Call before `finalize`.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Rename the staged file to `final_path`, then remove the staging dir.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let StagedFile { dir, file, path, .. } = self;
        drop(file);
        std::fs::rename(&path, final_path)?;
        dir.close()
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
