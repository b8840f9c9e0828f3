use std::{collections::HashMap, future::Future, sync::Arc};

use shared::domain::FinalSlide;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::ExportError,
    loader::ImageSource,
    pipeline::render_slide,
    raster::{SlideRasterizer, SLIDE_HEIGHT, SLIDE_WIDTH},
};

/// Thumbnails are captured at 1x.
const THUMBNAIL_SCALE: u32 = 1;

/// Captured slide images keyed by slide id (`slide-{index}`). The first image
/// stored for an id is kept until [`ThumbnailCache::clear`].
#[derive(Default)]
pub struct ThumbnailCache {
    entries: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl ThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, slide_id: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.lock().await.get(slide_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn snapshot(&self) -> HashMap<String, Arc<Vec<u8>>> {
        self.entries.lock().await.clone()
    }

    /// Returns the cached image for `slide_id`, running `capture` only on a
    /// miss. If two captures race, the one stored first wins.
    pub async fn get_or_capture<F, Fut>(
        &self,
        slide_id: &str,
        capture: F,
    ) -> Result<Arc<Vec<u8>>, ExportError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, ExportError>>,
    {
        if let Some(hit) = self.get(slide_id).await {
            return Ok(hit);
        }
        let captured = Arc::new(capture().await?);
        let mut entries = self.entries.lock().await;
        let stored = entries
            .entry(slide_id.to_string())
            .or_insert_with(|| captured);
        Ok(Arc::clone(stored))
    }

    /// Renders `slide` as a JPEG thumbnail unless one is already cached.
    pub async fn capture_slide(
        &self,
        slide: &FinalSlide,
        rasterizer: &dyn SlideRasterizer,
        images: &dyn ImageSource,
    ) -> Result<Arc<Vec<u8>>, ExportError> {
        let slide_id = slide.cache_id();
        let id = slide_id.as_str();
        self.get_or_capture(id, move || async move {
            debug!(slide_id = id, "capturing thumbnail");
            let mut surface = rasterizer
                .open_surface(SLIDE_WIDTH, SLIDE_HEIGHT, THUMBNAIL_SCALE)
                .await?;
            let rendered = render_slide(surface.as_mut(), images, slide).await?;
            Ok::<_, ExportError>(rendered.jpeg)
        })
        .await
    }
}

#[cfg(test)]
#[path = "tests/thumbnails_tests.rs"]
mod tests;
