//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Sync
//!
//! One line per decision, streamed while the run is in flight, then a
//! summary:
//!
//! ```text
//! skipped    Logo.png: name must start with a lowercase letter and contain only letters, digits and underscores
//! deleted    old_banner.webp
//! encoded    icon_foo.png → 3a9f2.webp  12.0 KB → 4.1 KB (-65.8%)
//! failed     broken.png: Processing failed: Failed to decode raw/broken.png: ...
//!
//! Synced: 3 unchanged, 1 encoded, 1 failed, 1 deleted, 1 skipped (5 total)
//! Constants: lib/res/images.g.dart
//! ```
//!
//! Unchanged files produce a line too; the binary only prints those with
//! `--verbose`.
//!
//! ## Check
//!
//! ```text
//! would encode  icon_foo.png → 3a9f2.webp
//! would delete  old_banner.webp
//!
//! 1 to encode, 1 to delete, 3 up to date
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability; the binary
//! does the printing. Format functions are pure: no I/O, no side effects.

use crate::sync::{SyncEvent, SyncOutcome, SyncPlan};

/// Human-readable size with one decimal: `512 B`, `12.3 KB`, `4.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// `12.0 KB → 4.1 KB (-65.8%)`; the percentage is omitted for empty sources.
pub fn format_size_delta(source_bytes: u64, output_bytes: u64) -> String {
    let sizes = format!(
        "{} → {}",
        format_size(source_bytes),
        format_size(output_bytes)
    );
    if source_bytes == 0 {
        return sizes;
    }
    let change = (output_bytes as f64 - source_bytes as f64) / source_bytes as f64 * 100.0;
    format!("{} ({:+.1}%)", sizes, change)
}

fn status_line(status: &str, detail: &str) -> String {
    format!("{:<10} {}", status, detail)
}

/// Format a single sync progress event as display lines.
pub fn format_sync_event(event: &SyncEvent) -> Vec<String> {
    let line = match event {
        SyncEvent::Skipped(skipped) => status_line(
            "skipped",
            &format!("{}: {}", skipped.path, skipped.reason),
        ),
        SyncEvent::Deleted { output } => status_line("deleted", output),
        SyncEvent::Unchanged {
            relative_path,
            output,
        } => status_line("unchanged", &format!("{} → {}", relative_path, output)),
        SyncEvent::Encoded {
            relative_path,
            output,
            source_bytes,
            output_bytes,
        } => status_line(
            "encoded",
            &format!(
                "{} → {}  {}",
                relative_path,
                output,
                format_size_delta(*source_bytes, *output_bytes)
            ),
        ),
        SyncEvent::Failed {
            relative_path,
            error,
        } => status_line("failed", &format!("{}: {}", relative_path, error)),
    };
    vec![line]
}

/// Summary lines printed after a sync run.
pub fn format_sync_summary(outcome: &SyncOutcome, constants_file: Option<&str>) -> Vec<String> {
    let mut lines = vec![String::new(), format!("Synced: {}", outcome.stats)];
    if let Some(file) = constants_file {
        let state = if outcome.constants_written {
            "written"
        } else {
            "unchanged"
        };
        lines.push(format!(
            "Constants: {} ({}, {} symbols)",
            file,
            state,
            outcome.bindings.len()
        ));
    }
    if !outcome.failures.is_empty() {
        lines.push(format!("{} file(s) failed:", outcome.failures.len()));
        for failure in &outcome.failures {
            lines.push(format!("    {}: {}", failure.relative_path, failure.error));
        }
    }
    lines
}

/// Report what a sync would do, for the `check` command.
pub fn format_plan(plan: &SyncPlan) -> Vec<String> {
    let mut lines = Vec::new();
    for skipped in &plan.skipped {
        lines.push(format!(
            "{:<13} {}: {}",
            "skipped", skipped.path, skipped.reason
        ));
    }
    for file in plan.pending() {
        lines.push(format!(
            "{:<13} {} → {}",
            "would encode", file.entry.relative_path, file.output
        ));
    }
    for orphan in &plan.orphans {
        lines.push(format!("{:<13} {}", "would delete", orphan));
    }

    let pending = plan.pending().count();
    let up_to_date = plan.files.len() - pending;
    if !lines.is_empty() {
        lines.push(String::new());
    }
    if plan.is_clean() {
        lines.push(format!("Up to date ({} files)", up_to_date));
    } else {
        lines.push(format!(
            "{} to encode, {} to delete, {} up to date",
            pending,
            plan.orphans.len(),
            up_to_date
        ));
    }
    lines
}
