//! Filesystem helpers.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write a file atomically: write to a temp file in the same directory,
/// then rename over the destination. Readers never observe partial content.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
