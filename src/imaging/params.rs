//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the sync engine (which decides which files to encode)
//! and the [`backend`](super::backend) (which does the actual pixel work).
//! This separation allows swapping backends (e.g. for testing with a mock)
//! without changing engine logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100, default 75). Clamped on construction.
//! - [`OutputFormat`]: encoder selected from the derived output extension.
//! - [`TranscodeParams`]: one source, one output, the encoder and its quality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The value as the `u8` the encoders take. Lossless, since the value is
    /// always within 1..=100.
    pub fn percent(self) -> u8 {
        u8::try_from(self.0).unwrap_or(100)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Encoded output format.
///
/// JPEG and AVIF are lossy and honor [`Quality`]. WebP output from the
/// pure-Rust encoder is lossless; PNG is re-compressed losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// Canonical file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
        }
    }

    /// Resolve the encoder from an output file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters for a single transcode: decode `source`, encode `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub quality: Quality,
}
