use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use client_core::ServiceApi;
use shared::{domain::FinalSlide, protocol::ServerEvent};
use slide_export::{
    chrome::{ChromeOptions, ChromeRasterizer},
    pdf_filename, ExportPipeline, HttpImageSource, SlideRasterizer, ThumbnailCache,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;

use crate::{
    config::{ExportMode, Settings},
    store::SavedDeck,
};

/// How long the progress line stays up after an export settles.
const PROGRESS_GRACE: Duration = Duration::from_millis(500);
const THUMBNAIL_DIR: &str = "thumbnails";

/// Launches the local browser used for PDF and thumbnail capture.
pub async fn launch_rasterizer(settings: &Settings) -> Result<Arc<ChromeRasterizer>> {
    let options = ChromeOptions {
        chrome_path: settings.chrome_path.clone(),
        base_href: Some(format!("{}/", settings.server_url.trim_end_matches('/'))),
        settle: None,
    };
    let rasterizer = tokio::task::spawn_blocking(move || ChromeRasterizer::launch(options))
        .await
        .context("browser launch task failed")??;
    Ok(Arc::new(rasterizer))
}

pub fn image_source(settings: &Settings) -> HttpImageSource {
    let base = match Url::parse(&settings.server_url) {
        Ok(base) => Some(base),
        Err(err) => {
            warn!(server_url = %settings.server_url, "cannot resolve relative image URLs: {err}");
            None
        }
    };
    HttpImageSource::new(base)
}

fn show_status(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r\x1b[2K{message}");
    let _ = stderr.flush();
}

fn show_progress(current: usize, total: usize) {
    show_status(&format!("Exporting slide {current}/{total}..."));
}

async fn clear_progress() {
    tokio::time::sleep(PROGRESS_GRACE).await;
    show_status("");
}

/// Exports `deck` to `<output_dir>/<title>.pdf` and returns the written path.
pub async fn export_deck(
    settings: &Settings,
    deck: &SavedDeck,
    rasterizer: Option<Arc<ChromeRasterizer>>,
) -> Result<PathBuf> {
    if deck.slides.is_empty() {
        bail!("deck '{}' has no slides to export", deck.title);
    }

    let result = match settings.export_mode {
        ExportMode::Client => export_locally(settings, deck, rasterizer).await,
        ExportMode::Server => export_on_server(settings, deck).await,
    };
    clear_progress().await;
    let (filename, bytes) = result?;

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create output directory {}",
                settings.output_dir.display()
            )
        })?;
    let path = settings.output_dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), mode = %settings.export_mode, "PDF saved");
    Ok(path)
}

async fn export_locally(
    settings: &Settings,
    deck: &SavedDeck,
    rasterizer: Option<Arc<ChromeRasterizer>>,
) -> Result<(String, Vec<u8>)> {
    let rasterizer = match rasterizer {
        Some(rasterizer) => rasterizer,
        None => launch_rasterizer(settings).await?,
    };
    let pipeline = ExportPipeline::new(rasterizer, Arc::new(image_source(settings)));
    let document = pipeline
        .export_slides(&deck.slides, &deck.title, show_progress)
        .await
        .context("PDF export failed")?;
    Ok((document.filename, document.bytes))
}

async fn export_on_server(settings: &Settings, deck: &SavedDeck) -> Result<(String, Vec<u8>)> {
    show_status(&format!("Rendering {} slides on the server...", deck.slides.len()));
    let api = ServiceApi::new(settings.server_url.clone());
    let bytes = api.export_pdf(&deck.slides, &deck.title).await?;
    Ok((pdf_filename(&deck.title), bytes))
}

async fn write_thumbnail(
    cache: &ThumbnailCache,
    slide: &FinalSlide,
    rasterizer: &dyn SlideRasterizer,
    images: &HttpImageSource,
    dir: &Path,
) -> Result<PathBuf> {
    let jpeg = cache.capture_slide(slide, rasterizer, images).await?;
    let path = dir.join(format!("{}.jpg", slide.cache_id()));
    tokio::fs::write(&path, jpeg.as_slice())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Captures a thumbnail for every slide event until the run ends. Failures
/// are logged and do not affect generation.
pub async fn capture_thumbnails(
    settings: Settings,
    rasterizer: Arc<ChromeRasterizer>,
    mut events: broadcast::Receiver<ServerEvent>,
) -> usize {
    let dir = settings.output_dir.join(THUMBNAIL_DIR);
    if let Err(err) = tokio::fs::create_dir_all(&dir).await {
        warn!(dir = %dir.display(), "cannot create thumbnail directory: {err}");
        return 0;
    }
    let images = image_source(&settings);
    let cache = ThumbnailCache::new();

    loop {
        match events.recv().await {
            Ok(ServerEvent::Slide(slide)) => {
                match write_thumbnail(&cache, &slide, rasterizer.as_ref(), &images, &dir).await {
                    Ok(path) => info!(slide = slide.index, path = %path.display(), "thumbnail saved"),
                    Err(err) => warn!(slide = slide.index, "thumbnail capture failed: {err:#}"),
                }
            }
            Ok(ServerEvent::Done(_)) | Ok(ServerEvent::Error(_)) => break,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "thumbnail capture fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    cache.len().await
}
