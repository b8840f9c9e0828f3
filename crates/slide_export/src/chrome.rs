//! Headless Chrome backed rasterizer.
//!
//! Each surface is a fresh tab plus a scratch directory holding the page files.
//! Both are released when the surface is dropped, including on error paths.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use headless_chrome::{
    protocol::cdp::Page::{CaptureScreenshotFormatOption, Viewport},
    types::Bounds,
    Browser, LaunchOptions, Tab,
};
use image::{ImageFormat, RgbaImage};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ExportError,
    raster::{
        compose_page, release_blocking, RenderSurface, SlideFrame, SlideRasterizer, SLIDE_HEIGHT,
        SLIDE_WIDTH,
    },
};

const IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_SETTLE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    /// Explicit browser binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
    /// Base for relative URLs inside slide markup.
    pub base_href: Option<String>,
    /// Pause after navigation before capture, for web fonts and layout.
    pub settle: Option<Duration>,
}

pub struct ChromeRasterizer {
    browser: Arc<Browser>,
    base_href: Option<String>,
    settle: Duration,
}

impl ChromeRasterizer {
    /// Starts the browser process. Blocking; call from `spawn_blocking` when
    /// on a runtime thread.
    pub fn launch(options: ChromeOptions) -> Result<Self, ExportError> {
        info!("launching headless Chrome");
        let mut builder = LaunchOptions::default_builder();
        builder
            .headless(true)
            .sandbox(false)
            .window_size(Some((SLIDE_WIDTH, SLIDE_HEIGHT)))
            .idle_browser_timeout(IDLE_TIMEOUT);
        if let Some(path) = &options.chrome_path {
            builder.path(Some(path.clone()));
        }
        let launch = builder
            .build()
            .map_err(|err| ExportError::Surface(err.to_string()))?;
        let browser = Browser::new(launch).map_err(|err| {
            ExportError::Surface(format!(
                "failed to launch Chrome/Chromium: {err}. Install it or set chrome_path"
            ))
        })?;
        Ok(Self {
            browser: Arc::new(browser),
            base_href: options.base_href,
            settle: options.settle.unwrap_or(DEFAULT_SETTLE),
        })
    }
}

#[async_trait]
impl SlideRasterizer for ChromeRasterizer {
    async fn open_surface(
        &self,
        width: u32,
        height: u32,
        scale: u32,
    ) -> Result<Box<dyn RenderSurface>, ExportError> {
        let browser = Arc::clone(&self.browser);
        let tab = tokio::task::spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|err| ExportError::Surface(err.to_string()))?;
            if let Err(err) = tab.set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(f64::from(width)),
                height: Some(f64::from(height)),
            }) {
                debug!("could not resize render tab: {err}");
            }
            Ok::<_, ExportError>(tab)
        })
        .await
        .map_err(|err| ExportError::Surface(err.to_string()))??;

        let workdir = tempfile::Builder::new()
            .prefix("slide-export-")
            .tempdir()
            .map_err(|err| ExportError::Surface(err.to_string()))?;
        debug!(dir = %workdir.path().display(), width, height, scale, "render surface opened");

        Ok(Box::new(ChromeSurface {
            tab,
            workdir,
            width,
            height,
            scale,
            base_href: self.base_href.clone(),
            settle: self.settle,
        }))
    }
}

struct ChromeSurface {
    tab: Arc<Tab>,
    workdir: TempDir,
    width: u32,
    height: u32,
    scale: u32,
    base_href: Option<String>,
    settle: Duration,
}

impl Drop for ChromeSurface {
    fn drop(&mut self) {
        let tab = Arc::clone(&self.tab);
        release_blocking(move || {
            if let Err(err) = tab.close(false) {
                warn!("failed to close render tab: {err}");
            }
        });
    }
}

#[async_trait]
impl RenderSurface for ChromeSurface {
    async fn render(&mut self, frame: &SlideFrame<'_>) -> Result<RgbaImage, ExportError> {
        let index = frame.index;
        let render_err = |reason: String| ExportError::Render { index, reason };

        let page = compose_page(frame, self.width, self.height, self.base_href.as_deref());
        let path = self.workdir.path().join(format!("slide-{index}.html"));
        tokio::fs::write(&path, page)
            .await
            .map_err(|err| render_err(err.to_string()))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| render_err(format!("bad page path {}", path.display())))?;

        let tab = Arc::clone(&self.tab);
        let viewport = Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(self.width),
            height: f64::from(self.height),
            scale: f64::from(self.scale),
        };
        let settle = self.settle;
        let png = tokio::task::spawn_blocking(move || {
            tab.navigate_to(url.as_str()).map_err(|err| err.to_string())?;
            tab.wait_until_navigated().map_err(|err| err.to_string())?;
            std::thread::sleep(settle);
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, Some(viewport), true)
                .map_err(|err| err.to_string())
        })
        .await
        .map_err(|err| render_err(err.to_string()))?
        .map_err(render_err)?;

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|err| render_err(err.to_string()))?;
        Ok(decoded.to_rgba8())
    }
}
