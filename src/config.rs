//! Pipeline configuration module.
//!
//! Handles loading, validating, and layering `imgsync.toml`. Configuration is
//! resolved in three layers, each overriding the previous one key by key:
//!
//! 1. Stock defaults ([`SyncConfig::default`])
//! 2. The config file (`imgsync.toml` in the working directory, or `--config`)
//! 3. Command-line flags, converted to a TOML overlay by the binary
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input_dir = "raw"                 # Source images
//! output_dir = "assets/images"      # Generated images (owned by imgsync)
//! # mapping_file = "raw/_mapping.json"
//! quality = 75                      # JPEG/AVIF quality (1-100)
//!
//! [obfuscation]
//! enabled = false
//! length = 6                        # Digest characters kept (1-64)
//! salt = "myapp"
//! dense = false                     # Re-encode the digest in base 58
//!
//! [normalization]
//! enabled = true                    # PNG sources are re-encoded
//! target = "webp"                   # or "avif"
//!
//! [constants]
//! # file = "lib/res/images.g.dart"
//! # format = "dart"                # or "typescript"; inferred from the extension
//! # name = "Images"                 # default: file name up to the first dot
//! import_prefix = "@"               # TypeScript require() prefix
//!
//! [processing]
//! # max_processes = 4               # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Paths are relative to the working directory. Unknown keys are rejected to
//! catch typos early.

use crate::emit::{ConstantsFormat, EmitSettings};
use crate::imaging::{OutputFormat, Quality};
use crate::mapping::MAPPING_FILENAME;
use crate::naming::{MAX_OBFUSCATION_LENGTH, NamingPolicy, Obfuscation};
use crate::sync::SyncSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "imgsync.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `imgsync.toml`.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Directory holding the source images.
    pub input_dir: String,
    /// Directory the pipeline owns and fills with generated images.
    pub output_dir: String,
    /// Mapping file location. Defaults to `<input_dir>/_mapping.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<String>,
    /// Encoder quality for JPEG and AVIF (1-100).
    pub quality: u32,
    pub obfuscation: ObfuscationConfig,
    pub normalization: NormalizationConfig,
    pub constants: ConstantsConfig,
    pub processing: ProcessingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            input_dir: "raw".to_string(),
            output_dir: "assets/images".to_string(),
            mapping_file: None,
            quality: Quality::default().value(),
            obfuscation: ObfuscationConfig::default(),
            normalization: NormalizationConfig::default(),
            constants: ConstantsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Salted digest names for outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObfuscationConfig {
    pub enabled: bool,
    /// Number of digest characters kept (1-64).
    pub length: usize,
    pub salt: String,
    /// Re-encode the truncated digest in the 58-character alphabet.
    pub dense: bool,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            length: 6,
            salt: "myapp".to_string(),
            dense: false,
        }
    }
}

/// PNG re-encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    pub enabled: bool,
    /// `webp` or `avif`.
    pub target: OutputFormat,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: OutputFormat::WebP,
        }
    }
}

/// Generated constants file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConstantsConfig {
    /// Path of the generated file; absent disables generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Inferred from the file extension when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ConstantsFormat>,
    /// Class or object name; derived from the file name when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prefix of TypeScript `require()` paths.
    pub import_prefix: String,
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self {
            file: None,
            format: None,
            name: None,
            import_prefix: "@".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for hashing and encoding.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Lexically normalized path: `.` components dropped, `..` folded where
/// possible. Used to compare configured directories without touching disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

impl SyncConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if !(1..=MAX_OBFUSCATION_LENGTH).contains(&self.obfuscation.length) {
            return Err(ConfigError::Validation(format!(
                "obfuscation.length must be 1-{}",
                MAX_OBFUSCATION_LENGTH
            )));
        }
        if self.obfuscation.enabled && self.obfuscation.salt.is_empty() {
            return Err(ConfigError::Validation(
                "obfuscation.salt must not be empty when obfuscation is enabled".into(),
            ));
        }
        if !matches!(
            self.normalization.target,
            OutputFormat::WebP | OutputFormat::Avif
        ) {
            return Err(ConfigError::Validation(
                "normalization.target must be \"webp\" or \"avif\"".into(),
            ));
        }
        if self.input_dir.is_empty() || self.output_dir.is_empty() {
            return Err(ConfigError::Validation(
                "input_dir and output_dir must not be empty".into(),
            ));
        }

        let input = normalize(Path::new(&self.input_dir));
        let output = normalize(Path::new(&self.output_dir));
        if input.starts_with(&output) || output.starts_with(&input) {
            return Err(ConfigError::Validation(format!(
                "input_dir ({}) and output_dir ({}) must not contain each other",
                self.input_dir, self.output_dir
            )));
        }

        if let Some(file) = &self.constants.file {
            if self.constants.format.is_none() && ConstantsFormat::from_path(Path::new(file)).is_none()
            {
                return Err(ConfigError::Validation(format!(
                    "cannot infer constants.format from {}; use .dart, .ts, .tsx or .js, or set it",
                    file
                )));
            }
        }
        Ok(())
    }

    /// Mapping file path, defaulting to `<input_dir>/_mapping.json`.
    pub fn mapping_path(&self) -> PathBuf {
        match &self.mapping_file {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.input_dir).join(MAPPING_FILENAME),
        }
    }

    /// Naming policy described by the `[obfuscation]` and `[normalization]`
    /// sections.
    pub fn naming_policy(&self) -> NamingPolicy {
        NamingPolicy {
            obfuscation: self.obfuscation.enabled.then(|| Obfuscation {
                salt: self.obfuscation.salt.clone(),
                length: self.obfuscation.length,
                dense: self.obfuscation.dense,
            }),
            normalize_png_to: self
                .normalization
                .enabled
                .then_some(self.normalization.target),
        }
    }

    /// Emitter settings, or `None` when no constants file is configured.
    pub fn emit_settings(&self) -> Result<Option<EmitSettings>, ConfigError> {
        let Some(file) = &self.constants.file else {
            return Ok(None);
        };
        let file = PathBuf::from(file);
        let format = match self.constants.format {
            Some(format) => format,
            None => ConstantsFormat::from_path(&file).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "cannot infer constants.format from {}",
                    file.display()
                ))
            })?,
        };
        let name = self
            .constants
            .name
            .clone()
            .unwrap_or_else(|| format.default_name(&file));
        let output_dir = self.output_dir.replace('\\', "/");
        let output_dir = output_dir.trim_start_matches("./").trim_end_matches('/');

        Ok(Some(EmitSettings {
            file,
            format,
            name,
            import_prefix: self.constants.import_prefix.clone(),
            output_dir: output_dir.to_string(),
        }))
    }

    /// Build the immutable settings for a sync run.
    pub fn to_settings(&self, force: bool) -> Result<SyncSettings, ConfigError> {
        Ok(SyncSettings {
            input_dir: PathBuf::from(&self.input_dir),
            output_dir: PathBuf::from(&self.output_dir),
            mapping_file: self.mapping_path(),
            quality: Quality::new(self.quality),
            naming: self.naming_policy(),
            constants: self.emit_settings()?,
            force,
        })
    }
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SyncConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Recursively merge `overlay` onto `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Pick the config file: an explicit path must exist; otherwise
/// [`DEFAULT_CONFIG_FILE`] is used when present.
pub fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            Ok(default.is_file().then_some(default))
        }
    }
}

/// Load a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge layers onto the stock defaults, then deserialize and validate.
pub fn resolve_config(layers: Vec<toml::Value>) -> Result<SyncConfig, ConfigError> {
    let merged = layers.into_iter().fold(stock_defaults_value(), merge_toml);
    let config: SyncConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config: stock defaults, then the config file (if
/// any), then the CLI overlay.
pub fn load_config(
    path: Option<&Path>,
    cli_overlay: toml::Value,
) -> Result<SyncConfig, ConfigError> {
    let mut layers = Vec::new();
    if let Some(path) = path {
        layers.push(load_raw_config(path)?);
    }
    layers.push(cli_overlay);
    resolve_config(layers)
}

/// Returns a fully-commented stock `imgsync.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgsync Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# Directory holding the source images. File names start with a lowercase
# letter, continue with letters, digits or underscores, and may end in an
# @2x/@3x suffix: icon_foo.png, icon_foo@2x.png.
input_dir = "raw"

# Directory for the generated images. imgsync owns this directory:
# files that no source maps to are deleted.
output_dir = "assets/images"

# Where the source -> output mapping is stored between runs.
# Defaults to <input_dir>/_mapping.json.
# mapping_file = "raw/_mapping.json"

# Encoder quality (1-100) for JPEG and AVIF output.
# WebP output is lossless, so quality has no effect on it. Re-encoding an
# already compressed source (for example a lossy .webp) can produce a larger
# file; in that case the source bytes are kept as the output.
quality = 75

# ---------------------------------------------------------------------------
# Obfuscated output names
# ---------------------------------------------------------------------------
[obfuscation]
# Replace each base name with a salted SHA-256 digest.
enabled = false
# Number of digest characters to keep (1-64).
length = 6
# Changing the salt renames every output.
salt = "myapp"
# Re-encode the digest in a 58-character alphabet for shorter names.
dense = false

# ---------------------------------------------------------------------------
# Format normalization
# ---------------------------------------------------------------------------
[normalization]
# Re-encode PNG sources. JPEG and WebP sources keep their format.
enabled = true
# "webp" or "avif".
target = "webp"

# ---------------------------------------------------------------------------
# Generated constants file
# ---------------------------------------------------------------------------
[constants]
# Path of the generated file. Omit to skip generation.
# file = "lib/res/images.g.dart"
# "dart" or "typescript". Inferred from the extension (.dart, .ts, .tsx, .js).
# format = "dart"
# Class (Dart) or exported object (TypeScript) name.
# Defaults to the file name up to the first dot: images.g.dart -> Images.
# name = "Images"
# Prefix of TypeScript require() paths.
import_prefix = "@"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel workers for hashing and encoding.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
