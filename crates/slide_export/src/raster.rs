//! Render surface abstraction and the page/JPEG helpers shared by every
//! rasterizer.

use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage, RgbaImage};

use crate::{error::ExportError, loader::LoadedImage};

/// Logical slide size in CSS pixels.
pub const SLIDE_WIDTH: u32 = 1280;
pub const SLIDE_HEIGHT: u32 = 720;
/// Device scale used for capture; output images are `SLIDE_WIDTH * SUPERSAMPLE` wide.
pub const SUPERSAMPLE: u32 = 2;
pub const JPEG_QUALITY: u8 = 95;

/// One slide as handed to a render surface.
pub struct SlideFrame<'a> {
    pub index: usize,
    pub html: &'a str,
    pub background: Option<&'a LoadedImage>,
}

/// An offscreen canvas of fixed size. Implementations release whatever they
/// hold (browser tab, scratch files) when dropped.
#[async_trait]
pub trait RenderSurface: Send {
    async fn render(&mut self, frame: &SlideFrame<'_>) -> Result<RgbaImage, ExportError>;
}

#[async_trait]
pub trait SlideRasterizer: Send + Sync {
    async fn open_surface(
        &self,
        width: u32,
        height: u32,
        scale: u32,
    ) -> Result<Box<dyn RenderSurface>, ExportError>;
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Builds the standalone page a surface loads for one slide. The background is
/// inlined as a data URL so capture never waits on the network.
pub fn compose_page(
    frame: &SlideFrame<'_>,
    width: u32,
    height: u32,
    base_href: Option<&str>,
) -> String {
    let base = base_href
        .map(|href| format!(r#"<base href="{}">"#, escape_attr(href)))
        .unwrap_or_default();
    let background = frame
        .background
        .map(|image| format!(r#"<img class="bg" alt="" src="{}">"#, image.data_url()))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
{base}
<style>
html, body {{ margin: 0; padding: 0; background: #ffffff; }}
#slide {{ position: relative; width: {width}px; height: {height}px; overflow: hidden; background: #ffffff; }}
#slide > .bg {{ position: absolute; inset: 0; width: 100%; height: 100%; object-fit: cover; }}
#slide > .content {{ position: relative; width: 100%; height: 100%; }}
</style>
</head>
<body>
<div id="slide" data-index="{index}">{background}<div class="content">{html}</div></div>
</body>
</html>
"#,
        index = frame.index,
        html = frame.html,
    )
}

/// Flattens `image` onto white and encodes it as baseline JPEG.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let flattened = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&flattened)?;
    Ok(out)
}

/// Runs a blocking release step without stalling an async worker. Inside a
/// runtime the step moves to the blocking pool; elsewhere it runs inline.
#[cfg_attr(not(feature = "chrome"), allow(dead_code))]
pub(crate) fn release_blocking<F>(release: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(release);
        }
        Err(_) => release(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn page_inlines_background_and_base() {
        let background = LoadedImage {
            bytes: vec![1, 2, 3],
            format: image::ImageFormat::Png,
            width: 1,
            height: 1,
        };
        let frame = SlideFrame {
            index: 4,
            html: "<h1>Hello</h1>",
            background: Some(&background),
        };
        let page = compose_page(&frame, SLIDE_WIDTH, SLIDE_HEIGHT, Some("http://host/?a=1&b=\"2\""));
        assert!(page.contains("width: 1280px; height: 720px"));
        assert!(page.contains(r#"src="data:image/png;base64,AQID""#));
        assert!(page.contains(r#"<base href="http://host/?a=1&amp;b=&quot;2&quot;">"#));
        assert!(page.contains(r#"<div class="content"><h1>Hello</h1></div>"#));
        assert!(page.contains(r#"data-index="4""#));
    }

    #[test]
    fn page_without_background_has_no_image() {
        let frame = SlideFrame {
            index: 0,
            html: "<p>x</p>",
            background: None,
        };
        let page = compose_page(&frame, 640, 360, None);
        assert!(!page.contains("<img"));
        assert!(!page.contains("<base"));
    }

    #[test]
    fn jpeg_flattens_transparency_onto_white() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        let jpeg = encode_jpeg(&image, JPEG_QUALITY).expect("encode");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&jpeg).expect("decode").to_rgb8();
        let px = decoded.get_pixel(4, 4).0;
        assert!(px.iter().all(|c| *c > 245), "{px:?}");
    }

    #[tokio::test]
    async fn release_leaves_the_runtime_thread() {
        let (tx, rx) = std::sync::mpsc::channel();
        release_blocking(move || {
            let _ = tx.send(std::thread::current().id());
        });
        let released_on = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("release ran");
        assert_ne!(released_on, std::thread::current().id());
    }

    #[test]
    fn release_runs_inline_without_runtime() {
        let (tx, rx) = std::sync::mpsc::channel();
        release_blocking(move || {
            let _ = tx.send(std::thread::current().id());
        });
        assert_eq!(rx.try_recv().expect("ran inline"), std::thread::current().id());
    }
}
