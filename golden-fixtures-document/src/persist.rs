//! Atomic file replacement.
//!
//! Contents go to a temporary file in the destination directory, which is
//! synced and then renamed over the target. Readers see either the old
//! file or the new one. If any step fails the temporary file is removed
//! when it is dropped.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace `path` with `contents` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    debug!(
        final_path = %path.display(),
        temp_path = %temp.path().display(),
        "Starting atomic golden write"
    );

    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), "Atomic rename completed");
    Ok(())
}
