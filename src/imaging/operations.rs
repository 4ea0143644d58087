//! High-level image operations.
//!
//! These functions sit between the sync engine and the backend: they resolve
//! the encoder from the output name, call the backend, and report sizes.

use super::backend::{BackendError, ImageBackend};
use super::params::{OutputFormat, Quality, TranscodeParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Byte sizes before and after a transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeReport {
    pub source_bytes: u64,
    pub output_bytes: u64,
}

/// Transcode `source` into `output`, picking the encoder from the output
/// file extension.
pub fn transcode_file(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    quality: Quality,
) -> Result<TranscodeReport> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = OutputFormat::from_extension(ext).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", ext))
    })?;

    let source_bytes = std::fs::metadata(source)?.len();
    backend.transcode(&TranscodeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        format,
        quality,
    })?;
    let output_bytes = std::fs::metadata(output)?.len();

    Ok(TranscodeReport {
        source_bytes,
        output_bytes,
    })
}
