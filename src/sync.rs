//! Incremental sync engine.
//!
//! Brings the output tree, the mapping file and the constants file in line
//! with the input tree. A run is four strictly ordered phases:
//!
//! 1. **Observe** ([`plan`]): scan the input root, load the mapping, derive
//!    every output name, reject naming collisions, list the output root.
//!    Nothing on disk is touched yet.
//! 2. **Reconcile deletions**: remove every output file that no current input
//!    maps to, then prune directories left empty.
//! 3. **Reconcile content**: transcode each input whose mapping record is
//!    missing, whose fingerprint changed, or whose output file is gone.
//!    Transcodes run in parallel; results are folded into the new mapping on
//!    the calling thread.
//! 4. **Persist and emit**: overwrite the mapping, then regenerate the
//!    constants file from it.
//!
//! ## Failure semantics
//!
//! A file that fails to transcode is reported and keeps its previous mapping
//! record; the rest of the run continues. Everything else (missing input
//! root, uncreatable directories, failed deletions, unwritable mapping or
//! constants file, naming collisions) aborts the run with a [`SyncError`].
//! Collisions are detected in phase 1, before any mutation.
//!
//! ## Progress
//!
//! Callers pass an optional [`Sender`]; every per-file decision is sent as a
//! [`SyncEvent`] as soon as it is made, from whichever worker made it.

use crate::emit::{EmitError, EmitSettings, bindings_from_mapping, write_constants};
use crate::imaging::{
    BackendError, ImageBackend, Quality, RustBackend, TranscodeReport, transcode_file,
};
use crate::mapping::{Mapping, MappingError};
use crate::naming::{NamingPolicy, derive_output_name, strip_density, symbol_name};
use crate::scan::{ScanError, scan};
use crate::types::{ConstantBinding, SkippedFile, SourceEntry};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),
    #[error("Constants error: {0}")]
    Emit(#[from] EmitError),
    #[error("Output name collision: {first} and {second} both produce {output}")]
    OutputCollision {
        output: String,
        first: String,
        second: String,
    },
    #[error("Symbol collision: {first} and {second} both produce the constant {symbol}")]
    SymbolCollision {
        symbol: String,
        first: String,
        second: String,
    },
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to list output directory: {0}")]
    ListOutput(#[from] walkdir::Error),
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: String,
        source: std::io::Error,
    },
}

/// Immutable inputs of a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mapping_file: PathBuf,
    pub quality: Quality,
    pub naming: NamingPolicy,
    /// Generated constants file; `None` skips emission.
    pub constants: Option<EmitSettings>,
    /// Re-encode everything. The stored mapping is still loaded so failed
    /// files keep their records.
    pub force: bool,
}

impl SyncSettings {
    /// Files the pipeline writes itself. They are never treated as inputs or
    /// orphans, wherever they live.
    fn owned_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.mapping_file.clone()];
        if let Some(constants) = &self.constants {
            files.push(constants.file.clone());
        }
        files
    }
}

/// Per-file progress, sent while the run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// An input file that does not follow the naming grammar.
    Skipped(SkippedFile),
    /// An orphaned output that was removed.
    Deleted { output: String },
    /// An input whose output is already current.
    Unchanged {
        relative_path: String,
        output: String,
    },
    Encoded {
        relative_path: String,
        output: String,
        source_bytes: u64,
        output_bytes: u64,
    },
    Failed {
        relative_path: String,
        error: String,
    },
}

/// Summary counters of a sync run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub unchanged: u32,
    pub encoded: u32,
    pub failed: u32,
    pub deleted: u32,
    pub skipped: u32,
}

impl SyncStats {
    /// Number of valid inputs seen by the run.
    pub fn total(&self) -> u32 {
        self.unchanged + self.encoded + self.failed
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unchanged, {} encoded", self.unchanged, self.encoded)?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.deleted > 0 {
            write!(f, ", {} deleted", self.deleted)?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// An input that failed to transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub relative_path: String,
    pub error: String,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct SyncOutcome {
    pub stats: SyncStats,
    /// The mapping as saved.
    pub mapping: Mapping,
    /// Bindings rendered into the constants file (computed even without one).
    pub bindings: Vec<ConstantBinding>,
    pub failures: Vec<FileFailure>,
    /// `true` when the constants file was (re)written this run.
    pub constants_written: bool,
}

/// One input and what phase 3 will do with it.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub entry: SourceEntry,
    /// Output name relative to the output root.
    pub output: String,
    /// Mapping record matches and the output exists: nothing to do.
    pub up_to_date: bool,
}

/// Everything phase 1 observed, before any mutation.
#[derive(Debug)]
pub struct SyncPlan {
    /// Inputs in relative path order.
    pub files: Vec<PlannedFile>,
    /// Output files (relative to the output root) with no current input.
    pub orphans: Vec<String>,
    pub skipped: Vec<SkippedFile>,
    /// Mapping as loaded. Failed transcodes fall back to these records,
    /// also with `force`.
    pub previous: Mapping,
}

impl SyncPlan {
    /// Inputs that need a transcode.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedFile> {
        self.files.iter().filter(|f| !f.up_to_date)
    }

    /// `true` when a sync would neither encode nor delete anything.
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty() && self.pending().next().is_none()
    }
}

/// Phase 1: observe the input tree, the mapping and the output tree.
///
/// Read-only; also backs the `check` command.
pub fn plan(settings: &SyncSettings) -> Result<SyncPlan, SyncError> {
    let report = scan(&settings.input_dir, &settings.owned_files())?;
    tracing::debug!(
        inputs = report.entries.len(),
        skipped = report.skipped.len(),
        "scanned input tree"
    );

    let previous = Mapping::load(&settings.mapping_file)?;

    let named: Vec<(SourceEntry, String)> = report
        .entries
        .into_values()
        .map(|entry| {
            let output = derive_output_name(&entry.relative_path, &settings.naming);
            (entry, output)
        })
        .collect();
    check_collisions(&named)?;

    let owned: Vec<String> = settings
        .owned_files()
        .iter()
        .filter_map(|p| relative_posix(&settings.output_dir, p))
        .collect();
    let existing = list_output_files(&settings.output_dir, &owned)?;
    let existing_set: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let needed: HashSet<&str> = named.iter().map(|(_, output)| output.as_str()).collect();

    let orphans: Vec<String> = existing
        .iter()
        .filter(|f| !needed.contains(f.as_str()))
        .cloned()
        .collect();

    let files = named
        .into_iter()
        .map(|(entry, output)| {
            let up_to_date = !settings.force
                && existing_set.contains(output.as_str())
                && previous.get(&entry.relative_path).is_some_and(|record| {
                    record.fingerprint == entry.fingerprint && record.output == output
                });
            if up_to_date {
                tracing::debug!(path = %entry.relative_path, "up to date");
            } else {
                tracing::debug!(path = %entry.relative_path, %output, "needs transcode");
            }
            PlannedFile {
                entry,
                output,
                up_to_date,
            }
        })
        .collect();

    Ok(SyncPlan {
        files,
        orphans,
        skipped: report.skipped,
        previous,
    })
}

/// Reject two inputs that would share an output name or a constant.
///
/// Output names are compared case-insensitively. Density variants of one
/// image (`icon.png`, `icon@2x.png`) legitimately share a symbol.
fn check_collisions(named: &[(SourceEntry, String)]) -> Result<(), SyncError> {
    let mut outputs: HashMap<String, &str> = HashMap::new();
    let mut symbols: HashMap<String, (&str, String)> = HashMap::new();

    for (entry, output) in named {
        let rel = entry.relative_path.as_str();
        if let Some(first) = outputs.insert(output.to_lowercase(), rel) {
            return Err(SyncError::OutputCollision {
                output: output.clone(),
                first: first.to_string(),
                second: rel.to_string(),
            });
        }

        let symbol = symbol_name(&entry.base_name);
        let image = strip_density(rel);
        match symbols.get(&symbol) {
            Some((first, first_image)) if *first_image != image => {
                return Err(SyncError::SymbolCollision {
                    symbol,
                    first: first.to_string(),
                    second: rel.to_string(),
                });
            }
            Some(_) => {}
            None => {
                symbols.insert(symbol, (rel, image));
            }
        }
    }
    Ok(())
}

/// `path` relative to `root` with `/` separators, if it lies under `root`.
fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Every regular file under the output root, minus the pipeline's own files.
fn list_output_files(root: &Path, owned: &[String]) -> Result<Vec<String>, SyncError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        match relative_posix(root, entry.path()) {
            Some(rel) if owned.contains(&rel) => {}
            Some(rel) => files.push(rel),
            None => tracing::warn!(path = %entry.path().display(), "ignoring non UTF-8 output path"),
        }
    }
    Ok(files)
}

fn create_dir(path: &Path) -> Result<(), SyncError> {
    std::fs::create_dir_all(path).map_err(|source| SyncError::CreateDir {
        path: path.display().to_string(),
        source,
    })
}

/// Remove empty directories below `root` (never `root` itself).
fn prune_empty_dirs(root: &Path) {
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let is_empty = std::fs::read_dir(entry.path()).is_ok_and(|mut d| d.next().is_none());
        if is_empty {
            match std::fs::remove_dir(entry.path()) {
                Ok(()) => tracing::debug!(path = %entry.path().display(), "pruned empty directory"),
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "could not prune")
                }
            }
        }
    }
}

/// Run a sync with the production [`RustBackend`].
pub fn sync(
    settings: &SyncSettings,
    events: Option<Sender<SyncEvent>>,
) -> Result<SyncOutcome, SyncError> {
    sync_with_backend(&RustBackend::new(), settings, events)
}

/// Run a sync with a specific backend (allows testing with mock).
pub fn sync_with_backend(
    backend: &impl ImageBackend,
    settings: &SyncSettings,
    events: Option<Sender<SyncEvent>>,
) -> Result<SyncOutcome, SyncError> {
    let send = |event: SyncEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };
    let mut stats = SyncStats::default();

    // Phase 1: observe
    let plan = plan(settings)?;
    for skipped in &plan.skipped {
        stats.skipped += 1;
        send(SyncEvent::Skipped(skipped.clone()));
    }

    create_dir(&settings.output_dir)?;
    for file in settings.owned_files() {
        if let Some(parent) = file.parent() {
            create_dir(parent)?;
        }
    }

    // Phase 2: reconcile deletions
    tracing::debug!(orphans = plan.orphans.len(), "deleting orphaned outputs");
    for orphan in &plan.orphans {
        let path = settings.output_dir.join(orphan);
        std::fs::remove_file(&path).map_err(|source| SyncError::Delete {
            path: path.display().to_string(),
            source,
        })?;
        stats.deleted += 1;
        send(SyncEvent::Deleted {
            output: orphan.clone(),
        });
    }
    if !plan.orphans.is_empty() {
        prune_empty_dirs(&settings.output_dir);
    }

    // Phase 3: reconcile content
    let (current, pending): (Vec<&PlannedFile>, Vec<&PlannedFile>) =
        plan.files.iter().partition(|f| f.up_to_date);
    tracing::debug!(
        unchanged = current.len(),
        pending = pending.len(),
        "transcoding changed inputs"
    );

    let mut mapping = Mapping::empty();
    for file in current {
        let rel = &file.entry.relative_path;
        if let Some(record) = plan.previous.get(rel) {
            mapping.insert(rel.clone(), record.fingerprint.clone(), record.output.clone());
        }
        stats.unchanged += 1;
        send(SyncEvent::Unchanged {
            relative_path: rel.clone(),
            output: file.output.clone(),
        });
    }

    let results: Vec<(&PlannedFile, Result<TranscodeReport, BackendError>)> = pending
        .into_par_iter()
        .map(|file| {
            let rel = &file.entry.relative_path;
            let result = transcode_file(
                backend,
                &settings.input_dir.join(rel),
                &settings.output_dir.join(&file.output),
                settings.quality,
            );
            match &result {
                Ok(report) => send(SyncEvent::Encoded {
                    relative_path: rel.clone(),
                    output: file.output.clone(),
                    source_bytes: report.source_bytes,
                    output_bytes: report.output_bytes,
                }),
                Err(e) => {
                    tracing::warn!(path = %rel, error = %e, "transcode failed");
                    send(SyncEvent::Failed {
                        relative_path: rel.clone(),
                        error: e.to_string(),
                    });
                }
            }
            (file, result)
        })
        .collect();

    let mut failures = Vec::new();
    for (file, result) in results {
        let rel = &file.entry.relative_path;
        match result {
            Ok(_) => {
                stats.encoded += 1;
                mapping.insert(
                    rel.clone(),
                    file.entry.fingerprint.clone(),
                    file.output.clone(),
                );
            }
            Err(e) => {
                stats.failed += 1;
                if let Some(record) = plan.previous.get(rel) {
                    mapping.insert(rel.clone(), record.fingerprint.clone(), record.output.clone());
                }
                failures.push(FileFailure {
                    relative_path: rel.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    // Phase 4: persist and emit
    mapping.save(&settings.mapping_file)?;
    let bindings = bindings_from_mapping(&mapping);
    let constants_written = match &settings.constants {
        Some(constants) => write_constants(&bindings, constants)?,
        None => false,
    };
    tracing::debug!(%stats, constants_written, "sync finished");

    Ok(SyncOutcome {
        stats,
        mapping,
        bindings,
        failures,
        constants_written,
    })
}
