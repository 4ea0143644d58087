//! Input tree scanning.
//!
//! Stage 1 of a sync run. Walks the input root recursively and turns every
//! file whose name follows the source grammar into a [`SourceEntry`] keyed by
//! its POSIX path relative to the root.
//!
//! ## Directory Structure
//!
//! ```text
//! raw/                         # Input root
//! ├── _mapping.json            # Mapping file (ignored)
//! ├── icon_foo.png             # → icon_foo.png
//! ├── icon_foo@2x.png          # density variant of the same image
//! ├── banners/
//! │   └── hero_1.jpg           # → banners/hero_1.jpg
//! ├── .DS_Store                # skipped: hidden file
//! └── Logo.png                 # skipped: uppercase
//! ```
//!
//! ## Rules
//!
//! - The mapping file and any other caller-supplied paths are ignored.
//! - Hidden files and directories (`.` prefix) are reported as skipped;
//!   hidden directories are not descended into.
//! - Every other file that fails [`parse_source_name`] becomes a
//!   [`SkippedFile`] with a reason; the scan continues.
//! - Fingerprints are computed in parallel on the rayon pool.
//!
//! A missing or unreadable input root aborts the scan.

use crate::hash::hash_file;
use crate::mapping::MAPPING_FILENAME;
use crate::naming::{ACCEPTED_EXTENSIONS, ParsedName, parse_source_name};
use crate::types::{SkippedFile, SourceEntry};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Failed to read input tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Observed state of the input tree.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Valid sources keyed by POSIX relative path.
    pub entries: BTreeMap<String, SourceEntry>,
    /// Non-conforming or unreadable files, in walk order.
    pub skipped: Vec<SkippedFile>,
}

/// A file that passed the grammar and still needs its fingerprint.
struct Candidate {
    relative_path: String,
    path: PathBuf,
    parsed: ParsedName,
}

/// Scan `root` for source images.
///
/// `ignored` lists full paths that belong to the pipeline itself (mapping
/// file, generated constants) and must not be reported even if they live
/// inside the input tree.
pub fn scan(root: &Path, ignored: &[PathBuf]) -> Result<ScanReport, ScanError> {
    if !root.exists() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut report = ScanReport::default();
    let mut candidates = Vec::new();

    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name() == MAPPING_FILENAME || ignored.iter().any(|p| p == path) {
            continue;
        }
        if entry.depth() > 0 && is_hidden(&entry) {
            let reason = if entry.file_type().is_dir() {
                walker.skip_current_dir();
                "hidden directory"
            } else {
                "hidden file"
            };
            tracing::debug!(path = %path.display(), reason, "skipping hidden entry");
            report.skipped.push(SkippedFile {
                path: relative_posix(root, path)
                    .unwrap_or_else(|| path.display().to_string()),
                reason: reason.to_string(),
            });
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative_path) = relative_posix(root, path) else {
            report.skipped.push(SkippedFile {
                path: path.display().to_string(),
                reason: "path is not valid UTF-8".to_string(),
            });
            continue;
        };
        let filename = entry.file_name().to_string_lossy();

        match parse_source_name(&filename) {
            Some(parsed) => candidates.push(Candidate {
                relative_path,
                path: path.to_path_buf(),
                parsed,
            }),
            None => {
                let reason = skip_reason(&filename);
                tracing::debug!(path = %relative_path, %reason, "skipping input file");
                report.skipped.push(SkippedFile {
                    path: relative_path,
                    reason,
                });
            }
        }
    }

    let fingerprinted: Vec<Result<SourceEntry, SkippedFile>> =
        candidates.into_par_iter().map(fingerprint).collect();

    for result in fingerprinted {
        match result {
            Ok(entry) => {
                report.entries.insert(entry.relative_path.clone(), entry);
            }
            Err(skipped) => report.skipped.push(skipped),
        }
    }

    Ok(report)
}

fn fingerprint(candidate: Candidate) -> Result<SourceEntry, SkippedFile> {
    let unreadable = |e: std::io::Error| SkippedFile {
        path: candidate.relative_path.clone(),
        reason: format!("unreadable: {}", e),
    };
    let size = std::fs::metadata(&candidate.path)
        .map_err(unreadable)?
        .len();
    let fingerprint = hash_file(&candidate.path).map_err(unreadable)?;

    Ok(SourceEntry {
        relative_path: candidate.relative_path,
        fingerprint,
        density: candidate.parsed.density,
        base_name: candidate.parsed.base,
        extension: candidate.parsed.extension,
        size,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// `path` relative to `root` with `/` separators, `None` if not UTF-8.
fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Human-readable reason why a filename failed the grammar.
fn skip_reason(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if ACCEPTED_EXTENSIONS.contains(&ext) => {
            "name must start with a lowercase letter and contain only letters, digits and underscores"
                .to_string()
        }
        Some((_, ext)) if ACCEPTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) => {
            format!("extension must be lowercase, found .{}", ext)
        }
        _ => format!(
            "not a supported image (expected .{})",
            ACCEPTED_EXTENSIONS.join(", .")
        ),
    }
}
