//! Shared test utilities for the imgsync test suite.
//!
//! Provides tiny synthetic images, source-tree setup, and output-tree
//! listings that the scanner, engine and backend tests build on.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let input = tmp.path().join("raw");
//! write_sources(&input, &["icon_foo.png", "banners/hero.jpg"]);
//!
//! // ... run a sync ...
//! assert_eq!(list_files(&output), vec!["banners/hero.jpg", "icon_foo.webp"]);
//! ```

use image::{ImageBuffer, Rgb, Rgba};
use std::path::Path;
use walkdir::WalkDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Deterministic gradient; `seed` shifts the colors so different seeds give
/// different bytes.
fn pixel(x: u32, y: u32, seed: u8) -> [u8; 3] {
    [
        (x * 7) as u8 ^ seed,
        (y * 13) as u8 ^ seed.wrapping_mul(3),
        ((x + y) * 5) as u8 ^ seed.wrapping_mul(7),
    ]
}

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
}

/// Write a small RGBA PNG.
pub fn write_test_png(path: &Path, width: u32, height: u32, seed: u8) {
    ensure_parent(path);
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let [r, g, b] = pixel(x, y, seed);
        Rgba([r, g, b, 255 - (x as u8 % 16)])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Write a small RGB JPEG.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32, seed: u8) {
    ensure_parent(path);
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb(pixel(x, y, seed)));
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

// =========================================================================
// Source trees
// =========================================================================

/// Create each relative path under `root` with distinct placeholder bytes.
///
/// The content is not a decodable image; use it with the mock backend.
pub fn write_sources(root: &Path, relative_paths: &[&str]) {
    for rel in relative_paths {
        write_source(root, rel, format!("source:{rel}").as_bytes());
    }
}

/// Create one file under `root` with the given content.
pub fn write_source(root: &Path, relative_path: &str, content: &[u8]) {
    let path = root.join(relative_path);
    ensure_parent(&path);
    std::fs::write(path, content).unwrap();
}

// =========================================================================
// Output trees
// =========================================================================

/// All regular files under `root` as sorted POSIX relative paths.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

/// All directories under `root` (excluding `root`) as sorted relative paths.
pub fn list_dirs(root: &Path) -> Vec<String> {
    let mut dirs: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    dirs.sort();
    dirs
}
