//! `dcrawl clean-locks` – remove leftover lock artifacts.

use std::path::Path;

use anyhow::{Context, Result};
use dcrawl_core::lock::sweep_lock_artifacts;

pub fn run_clean_locks(root: &Path) -> Result<()> {
    let removed = sweep_lock_artifacts(root).with_context(|| format!("sweep {}", root.display()))?;
    println!("Removed {} lock artifact(s) under {}", removed, root.display());
    Ok(())
}
