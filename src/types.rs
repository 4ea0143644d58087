//! Shared types used across the pipeline stages.
//!
//! The scanner produces [`SourceEntry`] and [`SkippedFile`] values, the sync
//! engine consumes them, and the emitter renders [`ConstantBinding`]s.

use serde::Serialize;

/// One valid source image under the input root.
///
/// Recomputed on every run; only its fingerprint ends up in the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    /// POSIX path relative to the input root, e.g. `icons/icon_foo@2x.png`.
    pub relative_path: String,
    /// SHA-256 of the file bytes.
    pub fingerprint: String,
    /// Density suffix including the `@`, e.g. `"@2x"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<String>,
    /// Base name without density suffix or extension.
    pub base_name: String,
    pub extension: String,
    /// File size in bytes.
    pub size: u64,
}

/// A file under the input root that the scanner ignored, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// A symbolic name in the generated constants file and the output it points to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ConstantBinding {
    /// camelCase form of the source base name.
    pub symbol: String,
    /// Output name relative to the output root.
    pub path: String,
}
