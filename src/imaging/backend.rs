//! Image transcoding backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the single seam between the sync engine and
//! codec work: given a [`TranscodeParams`], produce exactly one output file or
//! fail. Backends must never leave a partially written output behind, so a
//! failed transcode leaves whatever was on disk before untouched.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::TranscodeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image transcoding backends.
///
/// `Sync` so one backend instance can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Decode `params.source` and write it to `params.output` in
    /// `params.format` at `params.quality`.
    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError>;
}
