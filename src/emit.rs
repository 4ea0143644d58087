//! Generated constants file.
//!
//! Final stage of a sync run. Application code never spells output paths
//! (which may be obfuscated); it references a generated constant instead:
//!
//! ```dart
//! // Generated by imgsync. Do not edit.
//! class Images {
//!   static const String iconFoo = 'assets/images/3a9f2.webp';
//! }
//! ```
//!
//! ```ts
//! // Generated by imgsync. Do not edit.
//! export const images = {
//!   iconFoo: require('@/assets/images/3a9f2.webp'),
//! };
//! ```
//!
//! Dart paths keep the density suffix of the chosen variant; TypeScript paths
//! drop it because the bundler resolves `@2x`/`@3x` siblings itself.
//!
//! Bindings are sorted by symbol and the file is only rewritten when its
//! content changes, so unchanged runs leave it untouched.

use crate::mapping::Mapping;
use crate::naming::{density_factor, source_base, strip_density, symbol_name};
use crate::types::ConstantBinding;
use crate::writer::atomic_write;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// Generated by imgsync. Do not edit.";

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Cannot infer constants format from {0}; set constants.format")]
    UnknownFormat(PathBuf),
    #[error("Failed to write constants file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantsFormat {
    Dart,
    #[serde(alias = "ts")]
    TypeScript,
}

impl ConstantsFormat {
    /// Infer the format from a file extension: `.dart`, `.ts`, `.tsx`, `.js`.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "dart" => Some(Self::Dart),
            "ts" | "tsx" | "js" => Some(Self::TypeScript),
            _ => None,
        }
    }

    /// Default container name for a constants file: the file name up to the
    /// first dot, PascalCase for Dart and camelCase for TypeScript.
    ///
    /// `images.g.dart` → `Images`, `app_images.ts` → `appImages`.
    pub fn default_name(self, path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name.split('.').next().unwrap_or_default();
        let mut words = stem
            .split(['_', '-', ' '])
            .filter(|w| !w.is_empty())
            .map(capitalize);
        let mut name = match self {
            Self::Dart => words.next().unwrap_or_else(|| "Images".to_string()),
            Self::TypeScript => words
                .next()
                .map(|w| decapitalize(&w))
                .unwrap_or_else(|| "images".to_string()),
        };
        name.extend(words);
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Everything needed to render the constants file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSettings {
    pub file: PathBuf,
    pub format: ConstantsFormat,
    /// Class (Dart) or exported object (TypeScript) name.
    pub name: String,
    /// Prefix of TypeScript `require` paths, e.g. `@` or `.`.
    pub import_prefix: String,
    /// Output root as application code sees it, e.g. `assets/images`.
    pub output_dir: String,
}

/// Derive one binding per symbol from the mapping records.
///
/// Density variants of one image share a symbol; the variant without a
/// suffix wins, then the lowest density. Ties on different paths (which the
/// engine rejects up front) resolve to the smallest relative path.
pub fn bindings_from_mapping(mapping: &Mapping) -> Vec<ConstantBinding> {
    let mut chosen: BTreeMap<String, (u32, &str, &str)> = BTreeMap::new();

    for (relative_path, record) in &mapping.entries {
        let symbol = symbol_name(source_base(relative_path));
        let candidate = (
            density_factor(relative_path),
            relative_path.as_str(),
            record.output.as_str(),
        );
        chosen
            .entry(symbol)
            .and_modify(|current| {
                if (candidate.0, candidate.1) < (current.0, current.1) {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    chosen
        .into_iter()
        .map(|(symbol, (_, _, output))| ConstantBinding {
            symbol,
            path: output.to_string(),
        })
        .collect()
}

fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Single-quoted string literal body, valid in both Dart and TypeScript.
fn quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render the constants file. Bindings are sorted by symbol.
pub fn render(bindings: &[ConstantBinding], settings: &EmitSettings) -> String {
    let mut sorted: Vec<&ConstantBinding> = bindings.iter().collect();
    sorted.sort();

    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');

    match settings.format {
        ConstantsFormat::Dart => {
            out.push_str(&format!("class {} {{\n", settings.name));
            for b in sorted {
                let path = join_path(&[&settings.output_dir, &b.path]);
                out.push_str(&format!(
                    "  static const String {} = '{}';\n",
                    b.symbol,
                    quote(&path)
                ));
            }
            out.push_str("}\n");
        }
        ConstantsFormat::TypeScript => {
            out.push_str(&format!("export const {} = {{\n", settings.name));
            for b in sorted {
                let stripped = strip_density(&b.path);
                let path = match settings.import_prefix.as_str() {
                    "" => join_path(&[&settings.output_dir, &stripped]),
                    prefix => format!(
                        "{}/{}",
                        prefix.trim_end_matches('/'),
                        join_path(&[&settings.output_dir, &stripped])
                    ),
                };
                out.push_str(&format!("  {}: require('{}'),\n", b.symbol, quote(&path)));
            }
            out.push_str("};\n");
        }
    }
    out
}

/// Render and write the constants file. Returns `false` when the file
/// already had exactly this content and was left untouched.
pub fn write_constants(
    bindings: &[ConstantBinding],
    settings: &EmitSettings,
) -> Result<bool, EmitError> {
    let content = render(bindings, settings);
    if std::fs::read_to_string(&settings.file).is_ok_and(|existing| existing == content) {
        tracing::debug!(path = %settings.file.display(), "constants file unchanged");
        return Ok(false);
    }
    atomic_write(&settings.file, content.as_bytes()).map_err(|source| EmitError::Write {
        path: settings.file.display().to_string(),
        source,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn binding(symbol: &str, path: &str) -> ConstantBinding {
        ConstantBinding {
            symbol: symbol.into(),
            path: path.into(),
        }
    }

    fn settings(format: ConstantsFormat, name: &str) -> EmitSettings {
        EmitSettings {
            file: PathBuf::from("unused"),
            format,
            name: name.into(),
            import_prefix: "@".into(),
            output_dir: "assets/images".into(),
        }
    }

    fn mapping(records: &[(&str, &str)]) -> Mapping {
        let mut m = Mapping::empty();
        for (rel, output) in records {
            m.insert(rel.to_string(), "fp".into(), output.to_string());
        }
        m
    }

    // =========================================================================
    // Format inference and naming
    // =========================================================================

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ConstantsFormat::from_path(Path::new("lib/images.g.dart")),
            Some(ConstantsFormat::Dart)
        );
        assert_eq!(
            ConstantsFormat::from_path(Path::new("src/images.ts")),
            Some(ConstantsFormat::TypeScript)
        );
        assert_eq!(
            ConstantsFormat::from_path(Path::new("src/images.js")),
            Some(ConstantsFormat::TypeScript)
        );
        assert_eq!(ConstantsFormat::from_path(Path::new("images.txt")), None);
        assert_eq!(ConstantsFormat::from_path(Path::new("images")), None);
    }

    #[test]
    fn default_names() {
        let dart = ConstantsFormat::Dart;
        let ts = ConstantsFormat::TypeScript;
        assert_eq!(dart.default_name(Path::new("lib/images.g.dart")), "Images");
        assert_eq!(dart.default_name(Path::new("app_images.dart")), "AppImages");
        assert_eq!(ts.default_name(Path::new("src/images.ts")), "images");
        assert_eq!(ts.default_name(Path::new("app-images.ts")), "appImages");
        assert_eq!(ts.default_name(Path::new("Images.ts")), "images");
        assert_eq!(ts.default_name(Path::new("appImages.ts")), "appImages");
    }

    #[test]
    fn format_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct W {
            f: ConstantsFormat,
        }
        let w: W = toml::from_str(r#"f = "typescript""#).unwrap();
        assert_eq!(w.f, ConstantsFormat::TypeScript);
        let w: W = toml::from_str(r#"f = "ts""#).unwrap();
        assert_eq!(w.f, ConstantsFormat::TypeScript);
        let w: W = toml::from_str(r#"f = "dart""#).unwrap();
        assert_eq!(w.f, ConstantsFormat::Dart);
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    #[test]
    fn bindings_use_camel_case_symbols() {
        let m = mapping(&[("icon_foo.png", "3a9f2.webp"), ("banners/hero_1.jpg", "banners/hero_1.jpg")]);
        assert_eq!(
            bindings_from_mapping(&m),
            vec![
                binding("hero1", "banners/hero_1.jpg"),
                binding("iconFoo", "3a9f2.webp"),
            ]
        );
    }

    #[test]
    fn density_variants_collapse_preferring_base() {
        let m = mapping(&[
            ("icon@3x.png", "icon@3x.webp"),
            ("icon.png", "icon.webp"),
            ("icon@2x.png", "icon@2x.webp"),
        ]);
        assert_eq!(bindings_from_mapping(&m), vec![binding("icon", "icon.webp")]);
    }

    #[test]
    fn density_variants_collapse_to_lowest_without_base() {
        let m = mapping(&[("logo@3x.png", "logo@3x.webp"), ("logo@2x.png", "logo@2x.webp")]);
        assert_eq!(bindings_from_mapping(&m), vec![binding("logo", "logo@2x.webp")]);
    }

    #[test]
    fn empty_mapping_gives_no_bindings() {
        assert!(bindings_from_mapping(&Mapping::empty()).is_empty());
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn render_dart() {
        let bindings = vec![binding("zeta", "z.webp"), binding("iconFoo", "icons/3a9f2@2x.webp")];
        let out = render(&bindings, &settings(ConstantsFormat::Dart, "Images"));
        assert_eq!(
            out,
            "// Generated by imgsync. Do not edit.\n\
             class Images {\n  \
             static const String iconFoo = 'assets/images/icons/3a9f2@2x.webp';\n  \
             static const String zeta = 'assets/images/z.webp';\n\
             }\n"
        );
    }

    #[test]
    fn render_typescript_strips_density() {
        let bindings = vec![binding("iconFoo", "icons/3a9f2@2x.webp")];
        let out = render(&bindings, &settings(ConstantsFormat::TypeScript, "images"));
        assert_eq!(
            out,
            "// Generated by imgsync. Do not edit.\n\
             export const images = {\n  \
             iconFoo: require('@/assets/images/icons/3a9f2.webp'),\n\
             };\n"
        );
    }

    #[test]
    fn render_typescript_relative_prefix() {
        let mut s = settings(ConstantsFormat::TypeScript, "images");
        s.import_prefix = "./".into();
        s.output_dir = "assets/images/".into();
        let out = render(&[binding("a", "a.webp")], &s);
        assert!(out.contains("a: require('./assets/images/a.webp'),"));
    }

    #[test]
    fn render_typescript_empty_prefix() {
        let mut s = settings(ConstantsFormat::TypeScript, "images");
        s.import_prefix = String::new();
        let out = render(&[binding("a", "a.webp")], &s);
        assert!(out.contains("a: require('assets/images/a.webp'),"));
    }

    #[test]
    fn render_empty_bindings() {
        let out = render(&[], &settings(ConstantsFormat::Dart, "Images"));
        assert_eq!(out, "// Generated by imgsync. Do not edit.\nclass Images {\n}\n");
    }

    #[test]
    fn render_escapes_quotes() {
        let out = render(
            &[binding("a", "it's/a.webp")],
            &settings(ConstantsFormat::Dart, "Images"),
        );
        assert!(out.contains(r"'assets/images/it\'s/a.webp'"));
    }

    // =========================================================================
    // Writing
    // =========================================================================

    #[test]
    fn write_creates_file_and_skips_identical_rewrite() {
        let tmp = TempDir::new().unwrap();
        let mut s = settings(ConstantsFormat::Dart, "Images");
        s.file = tmp.path().join("lib/res/images.g.dart");
        let bindings = vec![binding("a", "a.webp")];

        assert!(write_constants(&bindings, &s).unwrap());
        let content = std::fs::read_to_string(&s.file).unwrap();
        assert!(content.starts_with(GENERATED_HEADER));

        assert!(!write_constants(&bindings, &s).unwrap());
        assert!(write_constants(&[binding("b", "b.webp")], &s).unwrap());
        assert!(std::fs::read_to_string(&s.file).unwrap().contains("b ="));
    }

    #[test]
    fn write_to_unwritable_path_fails() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let mut s = settings(ConstantsFormat::Dart, "Images");
        s.file = blocker.join("images.dart");

        assert!(matches!(
            write_constants(&[], &s),
            Err(EmitError::Write { .. })
        ));
    }
}
