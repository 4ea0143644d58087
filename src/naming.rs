//! Source filename grammar and output name derivation.
//!
//! Every source image follows the same naming pattern: a base name (a
//! lowercase letter, then letters, digits or underscores), an optional
//! density suffix, and an image extension:
//!
//! ```text
//! icon_foo.png        base=icon_foo            ext=png
//! icon_foo@2x.png     base=icon_foo  density=@2x  ext=png
//! banners/hero_1.jpg  base=hero_1              ext=jpg   (directory kept)
//! ```
//!
//! The output name is derived from the relative path alone, so it is a pure
//! function of the path and the [`NamingPolicy`]:
//!
//! 1. The density suffix is split off the base and reattached unchanged.
//! 2. With obfuscation, the base is replaced by a salted, truncated SHA-256
//!    digest ([`obfuscate`]).
//! 3. With normalization, `png` sources take the target format's extension.
//!    `jpg`, `jpeg` and `webp` always keep theirs.
//!
//! The symbolic constant name comes from the *source* base name, never the
//! obfuscated one: `icon_foo@2x.png` → `iconFoo`.

use crate::hash::hash_bytes;
use crate::imaging::OutputFormat;

/// Image extensions accepted by the source grammar (lowercase only).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Density markers recognized at the end of a base name.
pub const DENSITY_SUFFIXES: &[&str] = &["@2x", "@3x"];

/// 58-character alphabet for dense obfuscated names. Visually confusable
/// characters (`l`, `0`, `I`, `O`) are left out.
pub const DENSE_ALPHABET: &[u8; 58] =
    b"abcdefghijkmnopqrstuvwxyz123456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Maximum obfuscation length: the full SHA-256 hex digest.
pub const MAX_OBFUSCATION_LENGTH: usize = 64;

/// A source filename that passed the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Base name without density suffix or extension.
    pub base: String,
    /// Density suffix including the `@`, e.g. `"@2x"`.
    pub density: Option<String>,
    /// Lowercase extension without the dot.
    pub extension: String,
}

/// Salted digest settings for opaque output names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obfuscation {
    pub salt: String,
    /// Number of hex characters kept from the digest (1..=64).
    pub length: usize,
    /// Re-encode the truncated digest in [`DENSE_ALPHABET`].
    pub dense: bool,
}

/// Everything the name transformer needs besides the path itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingPolicy {
    pub obfuscation: Option<Obfuscation>,
    /// When set, `png` sources are re-encoded to this format.
    pub normalize_png_to: Option<OutputFormat>,
}

/// A relative path broken into the parts name derivation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitPath<'a> {
    dir: Option<&'a str>,
    base: &'a str,
    density: Option<&'a str>,
    extension: &'a str,
}

fn split_path(relative_path: &str) -> SplitPath<'_> {
    let (dir, filename) = match relative_path.rsplit_once('/') {
        Some((dir, filename)) => (Some(dir), filename),
        None => (None, relative_path),
    };
    let (stem, extension) = filename.rsplit_once('.').unwrap_or((filename, ""));
    let (base, density) = split_density(stem);
    SplitPath {
        dir,
        base,
        density,
        extension,
    }
}

/// Split a trailing density suffix off a stem.
///
/// - `"icon@2x"` → `("icon", Some("@2x"))`
/// - `"icon"` → `("icon", None)`
pub fn split_density(stem: &str) -> (&str, Option<&str>) {
    DENSITY_SUFFIXES
        .iter()
        .find_map(|suffix| {
            stem.strip_suffix(*suffix)
                .map(|base| (base, Some(&stem[base.len()..])))
        })
        .unwrap_or((stem, None))
}

/// `[a-z]` first, then ASCII word characters (`[A-Za-z0-9_]`).
fn is_valid_base(base: &str) -> bool {
    base.starts_with(|c: char| c.is_ascii_lowercase())
        && base.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a source filename (not a path) against the naming grammar.
///
/// Returns `None` for anything the scanner should skip:
/// - `"icon_foo.png"` → base=`icon_foo`, ext=`png`
/// - `"icon_foo@3x.webp"` → base=`icon_foo`, density=`@3x`, ext=`webp`
/// - `"iconFoo.png"`, `"icon__bar.png"` → accepted as written
/// - `"Icon.png"`, `"1icon.png"`, `"icon-foo.png"`, `"icon.PNG"`, `"icon.gif"` → `None`
pub fn parse_source_name(filename: &str) -> Option<ParsedName> {
    let (stem, extension) = filename.rsplit_once('.')?;
    if !ACCEPTED_EXTENSIONS.contains(&extension) {
        return None;
    }
    let (base, density) = split_density(stem);
    if !is_valid_base(base) {
        return None;
    }
    Some(ParsedName {
        base: base.to_string(),
        density: density.map(str::to_string),
        extension: extension.to_string(),
    })
}

/// Replace a base name with a salted, truncated digest.
///
/// The digest is SHA-256 over `base + salt`, so the same name in two apps
/// with different salts yields different files. Identical inputs always
/// produce identical output.
pub fn obfuscate(base: &str, obfuscation: &Obfuscation) -> String {
    let digest = hash_bytes(format!("{}{}", base, obfuscation.salt).as_bytes());
    let truncated = &digest[..obfuscation.length.clamp(1, MAX_OBFUSCATION_LENGTH)];
    if obfuscation.dense {
        encode_dense(truncated)
    } else {
        truncated.to_string()
    }
}

/// Re-encode a hex string's numeric value in [`DENSE_ALPHABET`].
///
/// Works on arbitrarily long inputs by repeated long division of the hex
/// digits, so a full 64-character digest is handled the same way as a short
/// prefix.
pub fn encode_dense(hex: &str) -> String {
    let mut digits: Vec<u32> = hex.chars().filter_map(|c| c.to_digit(16)).collect();
    let mut encoded = Vec::new();

    loop {
        match digits.iter().position(|&d| d != 0) {
            Some(first) => {
                digits.drain(..first);
            }
            None => break,
        }
        let mut remainder = 0u32;
        for digit in digits.iter_mut() {
            let acc = remainder * 16 + *digit;
            *digit = acc / 58;
            remainder = acc % 58;
        }
        encoded.push(DENSE_ALPHABET[remainder as usize] as char);
    }

    if encoded.is_empty() {
        encoded.push(DENSE_ALPHABET[0] as char);
    }
    encoded.iter().rev().collect()
}

/// Extension of the output file for a given source extension.
pub fn output_extension(source_extension: &str, policy: &NamingPolicy) -> String {
    match policy.normalize_png_to {
        Some(format) if source_extension == "png" => format.extension().to_string(),
        _ => source_extension.to_string(),
    }
}

/// Derive the output name (relative to the output root) for a source path.
///
/// `relative_path` is POSIX-style; the directory part is preserved.
pub fn derive_output_name(relative_path: &str, policy: &NamingPolicy) -> String {
    let parts = split_path(relative_path);

    let base = match &policy.obfuscation {
        Some(obfuscation) => obfuscate(parts.base, obfuscation),
        None => parts.base.to_string(),
    };
    let density = parts.density.unwrap_or("");

    let mut name = String::with_capacity(relative_path.len());
    if let Some(dir) = parts.dir {
        name.push_str(dir);
        name.push('/');
    }
    name.push_str(&base);
    name.push_str(density);
    if !parts.extension.is_empty() {
        name.push('.');
        name.push_str(&output_extension(parts.extension, policy));
    }
    name
}

/// Remove the density suffix from a path's file stem.
///
/// `"icons/abc12@2x.webp"` → `"icons/abc12.webp"`.
pub fn strip_density(path: &str) -> String {
    let parts = split_path(path);
    let mut stripped = String::with_capacity(path.len());
    if let Some(dir) = parts.dir {
        stripped.push_str(dir);
        stripped.push('/');
    }
    stripped.push_str(parts.base);
    if !parts.extension.is_empty() {
        stripped.push('.');
        stripped.push_str(parts.extension);
    }
    stripped
}

/// Base name of a source path with directory, density suffix and extension
/// removed: `"icons/icon_foo@2x.png"` → `"icon_foo"`.
pub fn source_base(relative_path: &str) -> &str {
    split_path(relative_path).base
}

/// Density of a path as a number, `1` when there is no suffix.
pub fn density_factor(path: &str) -> u32 {
    split_path(path)
        .density
        .and_then(|d| d.trim_start_matches('@').trim_end_matches('x').parse().ok())
        .unwrap_or(1)
}

/// snake_case → camelCase: `icon_foo_bar` → `iconFooBar`.
pub fn symbol_name(base: &str) -> String {
    let mut symbol = String::with_capacity(base.len());
    for (i, segment) in base.split('_').enumerate() {
        if i == 0 {
            symbol.push_str(segment);
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            symbol.extend(first.to_uppercase());
            symbol.push_str(chars.as_str());
        }
    }
    symbol
}
