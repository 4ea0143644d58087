//! Pure Rust transcoding backend with no system dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::ImageReader` with content sniffing |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! Encoding goes to an in-memory buffer first and is then written with
//! [`atomic_write`], so a decode or encode failure never clobbers an
//! existing output.
//!
//! When the source is already in the target format and the re-encode is not
//! smaller, the source bytes are written instead. The WebP encoder is
//! lossless only, so a lossy `.webp` source would otherwise grow.

use super::backend::{BackendError, ImageBackend};
use super::params::{OutputFormat, Quality, TranscodeParams};
use crate::writer::atomic_write;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded source together with its original bytes.
struct Source {
    bytes: Vec<u8>,
    /// Format sniffed from the content, if it is one we can also encode.
    format: Option<OutputFormat>,
    image: DynamicImage,
}

fn encodable(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::WebP => Some(OutputFormat::WebP),
        ImageFormat::Avif => Some(OutputFormat::Avif),
        _ => None,
    }
}

/// Read and decode an image from disk, sniffing the real format from content.
fn load_source(path: &Path) -> Result<Source, BackendError> {
    let bytes = std::fs::read(path)?;
    let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
    let format = reader.format().and_then(encodable);
    let image = reader.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok(Source {
        bytes,
        format,
        image,
    })
}

fn encode_failed(format: OutputFormat, e: image::ImageError) -> BackendError {
    BackendError::ProcessingFailed(format!("{} encode failed: {}", format, e))
}

/// Encode a decoded image into `format`, returning the file bytes.
fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let has_alpha = img.color().has_alpha();

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.percent());
            rgb.write_with_encoder(encoder)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive);
            img.write_with_encoder(encoder)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::WebP => {
            let normalized = if has_alpha {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder = WebPEncoder::new_lossless(&mut buf);
            normalized
                .write_with_encoder(encoder)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::Avif => {
            let normalized = if has_alpha {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality.percent());
            normalized
                .write_with_encoder(encoder)
                .map_err(|e| encode_failed(format, e))?;
        }
    }

    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn transcode(&self, params: &TranscodeParams) -> Result<(), BackendError> {
        let source = load_source(&params.source)?;
        let encoded = encode_image(&source.image, params.format, params.quality)?;
        let bytes = if source.format == Some(params.format) && encoded.len() >= source.bytes.len()
        {
            tracing::debug!(
                source = %params.source.display(),
                "re-encode is not smaller, keeping source bytes"
            );
            &source.bytes
        } else {
            &encoded
        };
        atomic_write(&params.output, bytes)?;
        Ok(())
    }
}
