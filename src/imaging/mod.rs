//! Image transcoding in pure Rust, with no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, WebP) |
//! | **Encode** | `image` codecs: JPEG, PNG, lossless WebP, AVIF (rav1e) |
//!
//! The module is split into:
//! - **Parameters**: Data structures describing a transcode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining format resolution + backend

pub mod backend;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use operations::{TranscodeReport, transcode_file};
pub use params::{OutputFormat, Quality, TranscodeParams};
pub use rust_backend::RustBackend;
