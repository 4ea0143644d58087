//! Persisted source → output mapping for incremental runs.
//!
//! Encoding is the bottleneck of a sync run, so the engine only re-encodes a
//! source when its content changed or its output disappeared. This module is
//! the memory between runs: one record per source image, keyed by the
//! image's POSIX path relative to the input root.
//!
//! # Design
//!
//! ## Records
//!
//! - **`fingerprint`**: SHA-256 of the source bytes at the time the output
//!   was last produced (see [`crate::hash`]).
//! - **`output`**: the output name (relative to the output root) that was
//!   produced.
//!
//! A record is only trusted together with the filesystem: the engine also
//! checks that the output still exists, so a manually deleted output is
//! re-created even when the record says "done".
//!
//! ## Storage
//!
//! Pretty-printed JSON, by default at `<input_dir>/_mapping.json`:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "icons/icon_foo.png": { "fingerprint": "…", "output": "icons/3a9f2.webp" }
//!   }
//! }
//! ```
//!
//! Entries are kept in a `BTreeMap`, so the same state always serializes to
//! the same bytes. [`Mapping::save`] replaces the whole file through a temp
//! file and rename; entries for inputs that no longer exist are simply not
//! part of the new mapping and disappear.

use crate::writer::atomic_write;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Default mapping file name, placed in the input directory.
pub const MAPPING_FILENAME: &str = "_mapping.json";

/// Version of the mapping format. Bump this to force a full re-encode when
/// the format or the fingerprint computation changes.
const MAPPING_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("failed to read mapping {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write mapping {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the previous run produced for one source image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingRecord {
    pub fingerprint: String,
    pub output: String,
}

/// On-disk mapping from source relative path to its last produced output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mapping {
    pub version: u32,
    pub entries: BTreeMap<String, MappingRecord>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::empty()
    }
}

impl Mapping {
    /// Create an empty mapping (used for `--force` or the first run).
    pub fn empty() -> Self {
        Self {
            version: MAPPING_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load a mapping file.
    ///
    /// A missing file is a first run and yields an empty mapping. A file that
    /// can't be parsed or has another format version is discarded with a
    /// warning: an empty mapping only costs re-encoding, a wrong one could
    /// skip work that is needed. Any other read error is returned.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(source) => {
                return Err(MappingError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let mapping: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable mapping");
                return Ok(Self::empty());
            }
        };
        if mapping.version != MAPPING_VERSION {
            tracing::warn!(
                path = %path.display(),
                found = mapping.version,
                expected = MAPPING_VERSION,
                "discarding mapping with a different format version"
            );
            return Ok(Self::empty());
        }
        Ok(mapping)
    }

    /// Serialize the complete mapping, replacing the file's prior contents.
    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        atomic_write(path, json.as_bytes()).map_err(|source| MappingError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn get(&self, relative_path: &str) -> Option<&MappingRecord> {
        self.entries.get(relative_path)
    }

    /// Record the output produced for a source.
    pub fn insert(&mut self, relative_path: String, fingerprint: String, output: String) {
        self.entries.insert(
            relative_path,
            MappingRecord {
                fingerprint,
                output,
            },
        );
    }

    /// `true` when the record for `relative_path` has this fingerprint.
    pub fn is_current(&self, relative_path: &str, fingerprint: &str) -> bool {
        self.get(relative_path)
            .is_some_and(|record| record.fingerprint == fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
