use std::fs;
use tempfile::TempDir;

use qrcraft::{
    export, EmbedRenderer, EmbeddedParameters, ErrorCorrection, ExportFormat, ExportRequest,
    PreviewController, PreviewState, QrEncoder, RasterSurface, RenderState, SizeClass, Surface,
    DEBOUNCE_MS,
};

#[test]
fn test_preview_then_png_export() {
    let mut preview = PreviewController::default();
    preview.set_content(0, "https://example.com");
    preview.set_size_class(0, SizeClass::Medium);
    preview.set_error_correction(0, ErrorCorrection::M);
    preview.set_margin(0, 4);

    preview.run_due(DEBOUNCE_MS, &QrEncoder);
    assert_eq!(preview.state(), PreviewState::Rendered);
    let artifact = preview.artifact().expect("preview should have rendered");
    assert_eq!(artifact.image().dimensions(), (300, 300));

    let png = export(
        preview.options(),
        &ExportRequest::preset(ExportFormat::Png),
        &QrEncoder,
    )
    .expect("export failed")
    .expect("content is not empty");

    let image = image::load_from_memory(&png.bytes).expect("invalid PNG");
    assert_eq!((image.width(), image.height()), (900, 900));

    // Export re-encodes; the cached preview is untouched.
    assert_eq!(preview.artifact().unwrap().image().dimensions(), (300, 300));
}

#[test]
fn test_export_is_idempotent_and_saved() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut preview = PreviewController::default();
    preview.set_content(0, "saved to disk");

    for format in ExportFormat::ALL {
        let request = ExportRequest::preset(format);
        let first = export(preview.options(), &request, &QrEncoder)
            .unwrap()
            .unwrap();
        let second = export(preview.options(), &request, &QrEncoder)
            .unwrap()
            .unwrap();
        assert_eq!(first.bytes, second.bytes, "{} output differs", format);

        let path = first.save_in(temp_dir.path()).expect("Failed to save");
        assert_eq!(path.file_name().unwrap(), format.file_name().as_str());
        assert_eq!(fs::read(&path).unwrap(), first.bytes);
    }

    let count = fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(count, 3);
}

#[test]
fn test_exported_png_scans_back() {
    let mut preview = PreviewController::default();
    preview.set_content(0, "https://example.com/scan");
    preview.set_error_correction(0, ErrorCorrection::H);
    preview.set_foreground(0, "#1e3a8a").unwrap();
    preview.set_background(0, "#fefce8").unwrap();

    let png = export(
        preview.options(),
        &ExportRequest::preset(ExportFormat::Png),
        &QrEncoder,
    )
    .unwrap()
    .unwrap();

    let gray = image::load_from_memory(&png.bytes).unwrap().to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare(gray);
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1);
    let (_, content) = grids[0].decode().unwrap();
    assert_eq!(content, "https://example.com/scan");
}

#[test]
fn test_embed_from_query_pairs() {
    let params = EmbeddedParameters::from_pairs([
        ("content", "embedded"),
        ("size", "128x64"),
        ("fg", "#000000"),
        ("bg", "#ffffff"),
        ("margin", "2"),
        ("ecl", "L"),
    ]);
    assert_eq!((params.width, params.height), (128, 64));

    let mut surface = RasterSurface::default();
    let mut renderer = EmbedRenderer::new(params);
    assert_eq!(renderer.render(&QrEncoder, &mut surface), RenderState::Rendered);
    assert_eq!(surface.dimensions(), (128, 128));
}

#[test]
fn test_embed_failure_is_never_blank() {
    let content = "0123456789abcdef".repeat(150);
    let params = EmbeddedParameters::from_pairs([
        ("content", content.as_str()),
        ("ecl", "H"),
        ("bg", "#102030"),
        ("fg", "#f0e0d0"),
    ]);
    let bg = params.background.to_rgba();
    let fg = params.foreground.to_rgba();

    let mut surface = RasterSurface::default();
    let mut renderer = EmbedRenderer::new(params);
    assert_eq!(renderer.render(&QrEncoder, &mut surface), RenderState::Failed);

    assert_eq!(surface.dimensions(), (256, 256));
    let image = surface.image();
    assert!(image.pixels().all(|p| *p == bg || *p == fg));
    assert!(image.pixels().any(|p| *p == fg));
    assert_eq!(*image.get_pixel(128, 0), bg);
}

#[test]
fn test_embed_render_saved_as_png() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let params = EmbeddedParameters::from_pairs([("content", "embed on disk"), ("size", "160x90")]);

    let mut surface = RasterSurface::default();
    let mut renderer = EmbedRenderer::new(params);
    assert_eq!(renderer.render(&QrEncoder, &mut surface), RenderState::Rendered);

    let path = temp_dir.path().join("embed.png");
    let expected = surface.image().clone();
    surface.into_image().save(&path).expect("Failed to save");

    let saved = image::open(&path).expect("invalid PNG").to_rgba8();
    assert_eq!(saved.dimensions(), (160, 160));
    assert_eq!(saved, expected);
}
