//! Offscreen slide rendering and PDF assembly.

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod document;
pub mod error;
pub mod filename;
pub mod loader;
pub mod pipeline;
pub mod raster;
pub mod thumbnails;

pub use error::ExportError;
pub use filename::{pdf_filename, sanitize_filename, DEFAULT_BASENAME};
pub use loader::{HttpImageSource, ImageSource, LoadedImage};
pub use pipeline::{ExportPipeline, ExportedDocument};
pub use raster::{RenderSurface, SlideFrame, SlideRasterizer};
pub use thumbnails::ThumbnailCache;

#[cfg(test)]
#[path = "tests/fakes.rs"]
pub(crate) mod fakes;
