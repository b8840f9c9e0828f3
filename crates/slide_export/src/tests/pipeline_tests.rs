use super::*;
use crate::fakes::{slide, FakeImages, FakeRasterizer, RenderCall, SHRINK};
use std::sync::atomic::Ordering;

fn pipeline(rasterizer: &Arc<FakeRasterizer>, images: &Arc<FakeImages>) -> ExportPipeline {
    ExportPipeline::new(rasterizer.clone(), images.clone())
}

#[tokio::test]
async fn exports_one_page_per_slide_with_progress() {
    let rasterizer = Arc::new(FakeRasterizer::default());
    let images = Arc::new(FakeImages::default());
    let mut second = slide(1);
    second.image_url = "/images/bg.png".to_string();
    let slides = vec![slide(0), second, slide(2)];

    let mut progress = Vec::new();
    let exported = pipeline(&rasterizer, &images)
        .export_slides(&slides, "Quarterly: Review", |current, total| {
            progress.push((current, total))
        })
        .await
        .expect("export");

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(exported.filename, "Quarterly_ Review.pdf");
    assert_eq!(exported.page_count, 3);
    assert!(exported.bytes.starts_with(b"%PDF"));

    let parsed = lopdf::Document::load_mem(&exported.bytes).expect("parse pdf");
    assert_eq!(parsed.get_pages().len(), 3);

    assert_eq!(
        rasterizer.calls(),
        vec![
            RenderCall {
                index: 0,
                scale: SUPERSAMPLE,
                with_background: false
            },
            RenderCall {
                index: 1,
                scale: SUPERSAMPLE,
                with_background: true
            },
            RenderCall {
                index: 2,
                scale: SUPERSAMPLE,
                with_background: false
            },
        ]
    );
    assert_eq!(images.load_count("/images/bg.png"), 1);
    assert_eq!(rasterizer.opened.load(Ordering::SeqCst), 1);
    assert_eq!(rasterizer.live_surfaces.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn broken_background_aborts_export() {
    let rasterizer = Arc::new(FakeRasterizer::default());
    let images = Arc::new(FakeImages::with_broken("/images/missing.png"));
    let mut second = slide(1);
    second.image_url = "/images/missing.png".to_string();
    let slides = vec![slide(0), second, slide(2)];

    let mut progress = Vec::new();
    let err = pipeline(&rasterizer, &images)
        .export_slides(&slides, "Deck", |current, total| {
            progress.push((current, total))
        })
        .await
        .expect_err("export must fail");

    assert!(matches!(err, ExportError::ImageLoad { ref url, .. } if url == "/images/missing.png"));
    assert_eq!(progress, vec![(1, 3), (2, 3)]);
    assert_eq!(rasterizer.calls().len(), 1);
    assert_eq!(rasterizer.live_surfaces.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn render_failure_releases_surface() {
    let rasterizer = Arc::new(FakeRasterizer::failing_on(0));
    let images = Arc::new(FakeImages::default());

    let err = pipeline(&rasterizer, &images)
        .export_slides(&[slide(0), slide(1)], "Deck", |_, _| {})
        .await
        .expect_err("render fails");

    assert!(matches!(err, ExportError::Render { index: 0, .. }));
    assert_eq!(rasterizer.live_surfaces.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_deck_is_rejected_before_opening_a_surface() {
    let rasterizer = Arc::new(FakeRasterizer::default());
    let images = Arc::new(FakeImages::default());

    let err = pipeline(&rasterizer, &images)
        .export_slides(&[], "Deck", |_, _| panic!("no progress expected"))
        .await
        .expect_err("empty");

    assert!(matches!(err, ExportError::NoSlides));
    assert_eq!(rasterizer.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn untitled_deck_uses_default_filename() {
    let rasterizer = Arc::new(FakeRasterizer::default());
    let images = Arc::new(FakeImages::default());

    let exported = pipeline(&rasterizer, &images)
        .export_slides(&[slide(0)], "  ", |_, _| {})
        .await
        .expect("export");

    assert_eq!(exported.filename, "presentation.pdf");
    let parsed = lopdf::Document::load_mem(&exported.bytes).expect("parse pdf");
    let page_id = parsed.get_pages()[&1];
    let resources = parsed
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Resources"))
        .and_then(lopdf::Object::as_dict)
        .expect("resources");
    let image_id = resources
        .get(b"XObject")
        .and_then(lopdf::Object::as_dict)
        .and_then(|xobjects| xobjects.get(b"Im0"))
        .and_then(lopdf::Object::as_reference)
        .expect("image ref");
    let image = parsed
        .get_object(image_id)
        .and_then(lopdf::Object::as_stream)
        .expect("image stream");
    let width = image.dict.get(b"Width").and_then(lopdf::Object::as_i64).expect("width");
    assert_eq!(width, i64::from(SLIDE_WIDTH * SUPERSAMPLE / SHRINK));
}
