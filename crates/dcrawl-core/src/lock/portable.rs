//! Exclusive-create locking for platforms without flock.

use std::fs::File;
use std::io;
use std::path::Path;

pub(super) fn try_lock(path: &Path) -> io::Result<Option<File>> {
    match File::options().write(true).create_new(true).open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}
