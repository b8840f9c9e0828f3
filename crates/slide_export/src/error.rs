use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no slides to export")]
    NoSlides,
    #[error("failed to load image {url}: {reason}")]
    ImageLoad { url: String, reason: String },
    #[error("failed to decode image {url}: {source}")]
    ImageDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to open render surface: {0}")]
    Surface(String),
    #[error("failed to render slide {index}: {reason}")]
    Render { index: usize, reason: String },
    #[error("failed to encode slide image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to assemble PDF: {0}")]
    Document(String),
}
