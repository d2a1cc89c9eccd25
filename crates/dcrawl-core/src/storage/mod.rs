//! Staged writes: documents land in a private temp dir next to their
//! destination and are renamed into place only after a successful sync, so
//! the destination path never holds a partial file.

mod staged;

pub use staged::StagedFile;

/// Prefix of the per-download staging directory created inside the
/// destination folder. Leftovers from a killed process can be swept by it.
pub const STAGING_PREFIX: &str = ".dcrawl-staging-";
