use std::sync::Arc;

use shared::domain::FinalSlide;
use tracing::{debug, info};

use crate::{
    document::SlideDocument,
    error::ExportError,
    filename::pdf_filename,
    loader::ImageSource,
    raster::{
        encode_jpeg, RenderSurface, SlideFrame, SlideRasterizer, JPEG_QUALITY, SLIDE_HEIGHT,
        SLIDE_WIDTH, SUPERSAMPLE,
    },
};

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub(crate) struct RenderedSlide {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Loads the slide's background (if any), renders it on `surface`, and
/// encodes the capture as JPEG.
pub(crate) async fn render_slide(
    surface: &mut dyn RenderSurface,
    images: &dyn ImageSource,
    slide: &FinalSlide,
) -> Result<RenderedSlide, ExportError> {
    let background = if slide.has_background() {
        Some(images.load(&slide.image_url).await?)
    } else {
        None
    };
    let frame = SlideFrame {
        index: slide.index,
        html: &slide.final_html,
        background: background.as_ref(),
    };
    let raster = surface.render(&frame).await?;
    let (width, height) = raster.dimensions();
    let jpeg = encode_jpeg(&raster, JPEG_QUALITY)?;
    Ok(RenderedSlide {
        jpeg,
        width,
        height,
    })
}

/// Client-side PDF export: every slide is rasterized in order on one surface
/// and placed on its own page.
pub struct ExportPipeline {
    rasterizer: Arc<dyn SlideRasterizer>,
    images: Arc<dyn ImageSource>,
}

impl ExportPipeline {
    pub fn new(rasterizer: Arc<dyn SlideRasterizer>, images: Arc<dyn ImageSource>) -> Self {
        Self { rasterizer, images }
    }

    /// `on_progress(current, total)` fires before each slide is rendered,
    /// with `current` counting from 1. The first failure aborts the export.
    pub async fn export_slides<F>(
        &self,
        slides: &[FinalSlide],
        title: &str,
        mut on_progress: F,
    ) -> Result<ExportedDocument, ExportError>
    where
        F: FnMut(usize, usize) + Send,
    {
        if slides.is_empty() {
            return Err(ExportError::NoSlides);
        }
        let total = slides.len();
        let mut surface = self
            .rasterizer
            .open_surface(SLIDE_WIDTH, SLIDE_HEIGHT, SUPERSAMPLE)
            .await?;
        let mut document = SlideDocument::new();

        for (position, slide) in slides.iter().enumerate() {
            on_progress(position + 1, total);
            let rendered = render_slide(surface.as_mut(), self.images.as_ref(), slide).await?;
            debug!(
                slide = slide.index,
                width = rendered.width,
                height = rendered.height,
                jpeg_bytes = rendered.jpeg.len(),
                "slide rasterized"
            );
            document.push_jpeg_page(rendered.jpeg, rendered.width, rendered.height)?;
        }
        drop(surface);

        let page_count = document.page_count();
        let bytes = document.finish()?;
        let filename = pdf_filename(title);
        info!(%filename, pages = page_count, bytes = bytes.len(), "PDF export finished");
        Ok(ExportedDocument {
            filename,
            bytes,
            page_count,
        })
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
