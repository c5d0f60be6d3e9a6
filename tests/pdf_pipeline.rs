//! Generated PDFs fed back through the rasterizer and the session

mod common;

use fereader::document::{
    DocumentError, LoadError, NoPrompt, PageRasterizer, ScriptedPrompt, Viewport,
};
use fereader::document::{Orientation, ViewMode};
use fereader::formats::pdf::PdfRasterizer;
use fereader::{Command, PageView, ReaderConfig, ReaderSession};

use common::{config_with_scratch, pdf_with_pages};

fn viewport() -> Viewport {
    Viewport::new(1000.0, 1000.0)
}

#[test]
fn images_to_pdf_round_trip_keeps_aspect_ratios() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "album.pdf", &[(300, 150), (120, 360)], None);

    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();
    assert_eq!(raster.page_count(), 2);

    let first = raster.page_size(0).unwrap();
    let second = raster.page_size(1).unwrap();
    assert!((first.aspect_ratio() - 2.0).abs() < 0.01);
    assert!((second.aspect_ratio() - 1.0 / 3.0).abs() < 0.01);
}

#[test]
fn render_dimensions_follow_scale() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "one.pdf", &[(200, 100)], None);
    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();

    let bitmap = raster.render_page(0, 1.5).unwrap();
    assert_eq!((bitmap.width, bitmap.height), (300, 150));
    assert_eq!(bitmap.pixels.len(), 300 * 150 * 4);

    // Non-positive scale renders at 1.0
    let fallback = raster.render_page(0, -2.0).unwrap();
    assert_eq!((fallback.width, fallback.height), (200, 100));
}

#[test]
fn render_is_bit_identical() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "two.pdf", &[(64, 48), (48, 64)], None);
    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();

    for index in 0..raster.page_count() {
        for scale in [0.5, 1.0, 2.25] {
            let a = raster.render_page(index, scale).unwrap();
            let b = raster.render_page(index, scale).unwrap();
            assert_eq!(a, b, "page {index} at {scale}");
        }
    }
}

#[test]
fn out_of_range_page_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "one.pdf", &[(10, 10)], None);
    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();

    let err = raster.render_page(1, 1.0).unwrap_err();
    assert!(matches!(
        err,
        fereader::RenderError::OutOfRange { index: 1, page_count: 1 }
    ));
}

#[test]
fn spread_places_pages_side_by_side() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "three.pdf", &[(100, 80), (60, 120), (50, 50)], None);
    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();

    let spread = raster.render_spread(0, 1.0).unwrap();
    assert_eq!((spread.width, spread.height), (160, 120));

    // Last page alone
    let tail = raster.render_spread(2, 1.0).unwrap();
    assert_eq!((tail.width, tail.height), (50, 50));
}

#[test]
fn close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "one.pdf", &[(10, 10)], None);
    let mut raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();
    raster.close();
    raster.close();
    assert!(!raster.is_open());
    assert!(raster.render_page(0, 1.0).is_err());
}

#[test]
fn initial_scale_fits_viewport() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "one.pdf", &[(400, 200)], None);
    let raster = PdfRasterizer::open(&pdf, &mut NoPrompt, 3).unwrap();

    assert!((raster.initial_scale(Viewport::new(200.0, 1000.0)) - 0.5).abs() < 1e-3);
    assert!((raster.initial_scale(Viewport::new(4000.0, 400.0)) - 2.0).abs() < 1e-3);
    // Clamped to the zoom domain
    assert_eq!(raster.initial_scale(Viewport::new(1.0, 1.0)), 0.1);
    assert_eq!(raster.initial_scale(Viewport::new(1e6, 1e6)), 5.0);
}

#[test]
fn correct_password_opens() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "locked.pdf", &[(40, 40)], Some("open-sesame"));

    let mut prompt = ScriptedPrompt::new(["wrong", "open-sesame"]);
    let raster = PdfRasterizer::open(&pdf, &mut prompt, 3).unwrap();
    assert_eq!(raster.page_count(), 1);
    assert_eq!(prompt.asked(), 2);
}

#[test]
fn wrong_password_fails_without_touching_session() {
    let dir = tempfile::tempdir().unwrap();
    let plain = pdf_with_pages(dir.path(), "plain.pdf", &[(40, 40), (40, 40)], None);
    let locked = pdf_with_pages(dir.path(), "locked.pdf", &[(40, 40)], Some("open-sesame"));

    let mut session = ReaderSession::new(config_with_scratch(dir.path()));
    session.open(&plain, &mut NoPrompt, viewport()).unwrap();
    session.apply(Command::Next);

    let mut prompt = ScriptedPrompt::new(["nope", "still-nope", "never"]);
    let err = session.open(&locked, &mut prompt, viewport()).unwrap_err();
    assert!(matches!(err, DocumentError::Load(LoadError::AuthFailed)));
    assert_eq!(prompt.asked(), 3);

    assert_eq!(session.info().unwrap().path, plain);
    assert_eq!(session.page_count(), 2);
    assert_eq!(session.current_index(), 1);
}

#[test]
fn cancelled_prompt_returns_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let locked = pdf_with_pages(dir.path(), "locked.pdf", &[(40, 40)], Some("open-sesame"));

    let err = PdfRasterizer::open(&locked, &mut NoPrompt, 3).unwrap_err();
    assert!(err.is_cancelled());

    let mut empty_answer = ScriptedPrompt::new([""]);
    let err = PdfRasterizer::open(&locked, &mut empty_answer, 3).unwrap_err();
    assert!(matches!(err, LoadError::Cancelled));
}

#[test]
fn encrypted_text_pdf_requires_password() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("memo.txt");
    std::fs::write(&input, "Top secret memo.\n\nSecond paragraph.").unwrap();
    let output = dir.path().join("memo.pdf");
    fereader::convert::text_to_pdf(&input, &output, Some("pw123")).unwrap();

    assert!(PdfRasterizer::open(&output, &mut NoPrompt, 3).is_err());
    let raster = PdfRasterizer::open(&output, &mut ScriptedPrompt::new(["pw123"]), 3).unwrap();
    assert!(raster.page_count() >= 1);
}

#[test]
fn session_single_view_uses_page_cache() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "doc.pdf", &[(100, 100), (100, 100)], None);
    let mut session = ReaderSession::new(config_with_scratch(dir.path()));
    session.open(&pdf, &mut NoPrompt, viewport()).unwrap();

    assert!(matches!(session.current_view().unwrap(), PageView::Raster(_)));
    assert!(matches!(session.current_view().unwrap(), PageView::Raster(_)));
    let stats = session.page_cache_stats();
    assert_eq!((stats.misses, stats.hits), (1, 1));
}

#[test]
fn session_continuous_cache_rebuilds_only_after_zoom() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "doc.pdf", &[(100, 50), (100, 50), (100, 50)], None);
    let mut session = ReaderSession::new(config_with_scratch(dir.path()));
    session.open(&pdf, &mut NoPrompt, viewport()).unwrap();
    session.apply(Command::SetViewMode(ViewMode::Continuous));

    match session.current_view().unwrap() {
        PageView::Continuous(pages) => assert_eq!(pages.len(), 3),
        other => panic!("unexpected view {other:?}"),
    }
    session.current_view().unwrap();
    assert_eq!(session.continuous_cache().rebuild_count(), 1);

    // Zoom while the continuous view is hidden still forces a rebuild
    session.apply(Command::SetViewMode(ViewMode::Single));
    assert!(session.apply(Command::ZoomOut));
    assert!(session.continuous_cache().is_dirty());
    session.apply(Command::SetViewMode(ViewMode::Continuous));
    session.current_view().unwrap();
    assert_eq!(session.continuous_cache().rebuild_count(), 2);
    assert_eq!(
        session.continuous_cache().built_scale(),
        Some(session.zoom().scale())
    );
}

#[test]
fn session_spread_navigation_on_odd_page_count() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "five.pdf", &[(20, 20); 5], None);
    let mut session = ReaderSession::new(ReaderConfig::default());
    session.open(&pdf, &mut NoPrompt, viewport()).unwrap();

    session.apply(Command::Next);
    assert_eq!(session.current_index(), 1);
    session.apply(Command::SetOrientation(Orientation::Horizontal));
    assert_eq!(session.current_index(), 0);

    for _ in 0..5 {
        session.apply(Command::Next);
    }
    assert_eq!(session.current_index(), 4);
    assert_eq!(session.status_line(), "five.pdf | Page 5/5");

    session.apply(Command::SetZoomPercent(100.0));
    match session.current_view().unwrap() {
        // Last spread has only one page
        PageView::Raster(bitmap) => assert_eq!(bitmap.width, 20),
        other => panic!("unexpected view {other:?}"),
    }
}

#[test]
fn session_initial_zoom_uses_viewport_minus_margin() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = pdf_with_pages(dir.path(), "doc.pdf", &[(100, 100)], None);
    let config = ReaderConfig {
        viewport_margin: 50.0,
        ..ReaderConfig::default()
    };
    let mut session = ReaderSession::new(config);
    session
        .open(&pdf, &mut NoPrompt, Viewport::new(250.0, 450.0))
        .unwrap();
    assert_eq!(session.zoom_percent(), Some(200));
}
