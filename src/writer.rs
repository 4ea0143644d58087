//! Atomic file writes.
//!
//! Every file the pipeline owns (encoded images, the mapping, the constants
//! file) is written through [`atomic_write`]: the content goes to a temporary
//! file in the destination directory, which is then renamed over the target.
//! An interrupted run leaves either the old file or the new one, never a
//! truncated mix.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `content` to `path` atomically, creating parent directories.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
