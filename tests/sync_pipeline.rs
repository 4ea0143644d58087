//! End-to-end sync runs against the pure-Rust imaging backend.
//!
//! Source images are synthesized with the `image` crate so the tests need no
//! fixtures on disk.

use image::{ImageBuffer, Rgb, Rgba};
use imgsync::emit::{ConstantsFormat, EmitSettings, GENERATED_HEADER};
use imgsync::imaging::{OutputFormat, Quality};
use imgsync::mapping::{MAPPING_FILENAME, Mapping};
use imgsync::naming::{NamingPolicy, Obfuscation};
use imgsync::sync::{SyncEvent, SyncSettings, sync};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_png(path: &Path, seed: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(24, 16, |x, y| {
        Rgba([
            (x as u8).wrapping_mul(9).wrapping_add(seed),
            (y as u8).wrapping_mul(13),
            seed,
            255,
        ])
    });
    img.save(path).unwrap();
}

fn write_jpeg(path: &Path, seed: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(32, 24, |x, y| {
        Rgb([(x as u8).wrapping_mul(7), (y as u8).wrapping_mul(5), seed])
    });
    img.save(path).unwrap();
}

fn settings(tmp: &TempDir) -> SyncSettings {
    let input_dir = tmp.path().join("raw");
    fs::create_dir_all(&input_dir).unwrap();
    SyncSettings {
        mapping_file: input_dir.join(MAPPING_FILENAME),
        input_dir,
        output_dir: tmp.path().join("assets/images"),
        quality: Quality::new(75),
        naming: NamingPolicy {
            obfuscation: None,
            normalize_png_to: Some(OutputFormat::WebP),
        },
        constants: None,
        force: false,
    }
}

fn output_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

// =============================================================================
// Transcoding
// =============================================================================

#[test]
fn png_is_normalized_to_webp() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    write_png(&s.input_dir.join("icon_foo.png"), 1);
    write_jpeg(&s.input_dir.join("banners/hero_1.jpg"), 2);

    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.encoded, 2);
    assert!(outcome.failures.is_empty());
    assert_eq!(
        output_files(&s.output_dir),
        vec!["banners/hero_1.jpg", "icon_foo.webp"]
    );

    let webp = fs::read(s.output_dir.join("icon_foo.webp")).unwrap();
    assert_eq!(&webp[..4], b"RIFF");
    assert_eq!(&webp[8..12], b"WEBP");

    let jpeg = fs::read(s.output_dir.join("banners/hero_1.jpg")).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn obfuscated_outputs_are_decodable() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(&tmp);
    s.naming.obfuscation = Some(Obfuscation {
        salt: "myapp".into(),
        length: 6,
        dense: false,
    });
    write_png(&s.input_dir.join("icon_foo.png"), 3);

    let outcome = sync(&s, None).unwrap();

    let record = outcome.mapping.get("icon_foo.png").unwrap();
    assert_eq!(record.output.len(), "xxxxxx.webp".len());
    assert!(record.output.ends_with(".webp"));
    let decoded = image::open(s.output_dir.join(&record.output)).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (24, 16));
}

// =============================================================================
// Incremental behavior
// =============================================================================

#[test]
fn second_run_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    write_png(&s.input_dir.join("a.png"), 1);
    write_png(&s.input_dir.join("b.png"), 2);

    sync(&s, None).unwrap();
    let before = fs::read(s.output_dir.join("a.webp")).unwrap();
    let mapping_before = fs::read_to_string(&s.mapping_file).unwrap();

    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.unchanged, 2);
    assert_eq!(outcome.stats.encoded, 0);
    assert_eq!(fs::read(s.output_dir.join("a.webp")).unwrap(), before);
    assert_eq!(fs::read_to_string(&s.mapping_file).unwrap(), mapping_before);
}

#[test]
fn changed_source_is_re_encoded() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    let source = s.input_dir.join("a.png");
    write_png(&source, 1);
    write_png(&s.input_dir.join("b.png"), 2);
    sync(&s, None).unwrap();

    write_png(&source, 99);
    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.encoded, 1);
    assert_eq!(outcome.stats.unchanged, 1);
    let saved = Mapping::load(&s.mapping_file).unwrap();
    assert_eq!(
        saved.get("a.png").unwrap().fingerprint,
        imgsync::hash::hash_file(&source).unwrap()
    );
}

#[test]
fn removed_source_deletes_output_and_constant() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(&tmp);
    let constants_file = tmp.path().join("src/images.ts");
    s.constants = Some(EmitSettings {
        file: constants_file.clone(),
        format: ConstantsFormat::TypeScript,
        name: "images".into(),
        import_prefix: "@".into(),
        output_dir: "assets/images".into(),
    });
    write_png(&s.input_dir.join("keep.png"), 1);
    write_png(&s.input_dir.join("old/gone.png"), 2);
    sync(&s, None).unwrap();
    assert!(fs::read_to_string(&constants_file).unwrap().contains("gone:"));

    fs::remove_file(s.input_dir.join("old/gone.png")).unwrap();
    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.deleted, 1);
    assert_eq!(output_files(&s.output_dir), vec!["keep.webp"]);
    assert!(!s.output_dir.join("old").exists());
    assert!(outcome.mapping.get("old/gone.png").is_none());
    assert_eq!(
        fs::read_to_string(&constants_file).unwrap(),
        format!(
            "{}\nexport const images = {{\n  keep: require('@/assets/images/keep.webp'),\n}};\n",
            GENERATED_HEADER
        )
    );
}

#[test]
fn word_character_names_are_accepted() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    write_png(&s.input_dir.join("iconFoo.png"), 1);
    write_png(&s.input_dir.join("icon__bar.png"), 2);

    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.encoded, 2);
    assert_eq!(outcome.stats.skipped, 0);
    assert_eq!(
        output_files(&s.output_dir),
        vec!["iconFoo.webp", "icon__bar.webp"]
    );
}

// =============================================================================
// Grammar and failures
// =============================================================================

#[test]
fn non_conforming_names_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    write_png(&s.input_dir.join("a.png"), 1);
    write_png(&s.input_dir.join("A.png"), 2);
    fs::write(s.input_dir.join("notes.txt"), "hello").unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let outcome = sync(&s, Some(tx)).unwrap();
    let events: Vec<SyncEvent> = rx.iter().collect();

    assert_eq!(outcome.stats.encoded, 1);
    assert_eq!(outcome.stats.skipped, 2);
    assert_eq!(output_files(&s.output_dir), vec!["a.webp"]);
    let skipped: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Skipped(s) => Some(s.path.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec!["A.png", "notes.txt"]);
}

#[test]
fn corrupt_image_does_not_abort_the_run() {
    let tmp = TempDir::new().unwrap();
    let s = settings(&tmp);
    write_png(&s.input_dir.join("good.png"), 1);
    fs::write(s.input_dir.join("broken.png"), b"not an image").unwrap();

    let outcome = sync(&s, None).unwrap();

    assert_eq!(outcome.stats.encoded, 1);
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(outcome.failures[0].relative_path, "broken.png");
    assert!(outcome.mapping.get("broken.png").is_none());
    assert_eq!(output_files(&s.output_dir), vec!["good.webp"]);
}

// =============================================================================
// Constants
// =============================================================================

#[test]
fn dart_constants_track_outputs() {
    let tmp = TempDir::new().unwrap();
    let mut s = settings(&tmp);
    let constants_file = tmp.path().join("lib/res/images.g.dart");
    s.constants = Some(EmitSettings {
        file: constants_file.clone(),
        format: ConstantsFormat::Dart,
        name: "Images".into(),
        import_prefix: String::new(),
        output_dir: "assets/images".into(),
    });
    write_png(&s.input_dir.join("icon_foo.png"), 1);
    write_png(&s.input_dir.join("icon_foo@2x.png"), 2);
    write_jpeg(&s.input_dir.join("banners/hero_1.jpg"), 3);

    let outcome = sync(&s, None).unwrap();

    assert!(outcome.constants_written);
    assert_eq!(
        fs::read_to_string(&constants_file).unwrap(),
        format!(
            "{}\nclass Images {{\n  static const String hero1 = 'assets/images/banners/hero_1.jpg';\n  static const String iconFoo = 'assets/images/icon_foo.webp';\n}}\n",
            GENERATED_HEADER
        )
    );

    let outcome = sync(&s, None).unwrap();
    assert!(!outcome.constants_written);
}
