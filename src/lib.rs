//! # imgsync
//!
//! Incremental image asset pipeline. Keeps a directory of optimized (and
//! optionally renamed) images, a mapping file and a generated constants file
//! in sync with a directory of source images, re-encoding only what changed.
//!
//! # Architecture: Four-Phase Sync
//!
//! ```text
//! 1. Observe      raw/ + _mapping.json + assets/images/  →  plan
//! 2. Delete       orphaned outputs                        →  assets/images/
//! 3. Transcode    new or changed sources (parallel)       →  assets/images/
//! 4. Persist      mapping + constants                     →  _mapping.json, images.g.dart
//! ```
//!
//! The mapping records, per source, the fingerprint of the bytes that
//! produced the current output. A source is skipped only when its fingerprint
//! matches *and* the output is still on disk, so deleting outputs by hand is
//! always safe: the next run recreates them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sync`] | The engine: planning, deletions, parallel transcoding, persistence |
//! | [`scan`] | Walks the input tree, applies the filename grammar, fingerprints sources |
//! | [`naming`] | Filename grammar, density suffixes, obfuscation, output and symbol names |
//! | [`mapping`] | Versioned JSON mapping between runs |
//! | [`emit`] | Generated Dart / TypeScript constants file |
//! | [`imaging`] | Pure-Rust transcoding behind the [`imaging::ImageBackend`] trait |
//! | [`hash`] | Streaming SHA-256 fingerprints |
//! | [`writer`] | Atomic temp-file-then-rename writes |
//! | [`config`] | `imgsync.toml` loading, layering and validation |
//! | [`types`] | Types shared between stages (`SourceEntry`, `ConstantBinding`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Content Hashes, Not Timestamps
//!
//! Change detection uses SHA-256 of the source bytes. Checkouts, copies and
//! `touch` change mtimes without changing images; none of them trigger a
//! re-encode.
//!
//! ## The Output Directory Is Owned
//!
//! Every file under the output root that no current source maps to is
//! deleted. Renames and deletions in the input tree therefore never leave
//! stale assets behind, and the constants file never references a missing
//! file.
//!
//! ## Collisions Fail Early
//!
//! Two sources that would produce the same output name (`icon.png` and
//! `icon.webp` with PNG normalization) or the same constant abort the run
//! before anything is written.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate only. The binary has no system
//! dependencies.

pub mod config;
pub mod emit;
pub mod hash;
pub mod imaging;
pub mod mapping;
pub mod naming;
pub mod output;
pub mod scan;
pub mod sync;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
