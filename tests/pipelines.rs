//! Integration tests for the three pipelines and the tools session.
//!
//! Everything runs locally: produced PDFs are parsed back with `lopdf` and
//! QR codes are scanned with `rqrr`.
//!
//! Run with:
//!   cargo test --test pipelines -- --nocapture

use image::{ImageFormat, Rgb, RgbImage};
use portfolio_devtools::pipeline::document::{assemble, assemble_with_reader};
use portfolio_devtools::pipeline::input::read_qr_upload;
use portfolio_devtools::pipeline::qr::{encode_qr, generate};
use portfolio_devtools::pipeline::resize::resize_image;
use portfolio_devtools::{
    DevTools, DocumentOptions, DocumentProgressCallback, PageContent, QrInput, QrOptions,
    ResizeOptions, ResizeParams, SelectedFile, ToolTab, ToolsConfig, ToolsError,
    DEFAULT_MAX_QR_UPLOAD_BYTES,
};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library logs to the test harness. Honours `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// PNG of deterministic noise; noise keeps JPEG sizes meaningful.
fn noise_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let img = RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn text_file(name: &str, body: &str) -> SelectedFile {
    SelectedFile::from_bytes(name, "text/plain", body.as_bytes().to_vec())
}

fn png_file(name: &str, width: u32, height: u32) -> SelectedFile {
    SelectedFile::from_bytes(name, "image/png", noise_png(width, height, 7))
}

/// Decoded content stream of each page, in page order.
fn page_contents(pdf: &[u8]) -> Vec<String> {
    let doc = lopdf::Document::load_mem(pdf).expect("produced PDF must parse");
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
        .collect()
}

fn scan_qr(png: &[u8]) -> String {
    let img = image::load_from_memory(png).unwrap().to_luma8();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(img.width() as usize, img.height() as usize, |x, y| {
            img.get_pixel(x as u32, y as u32).0[0]
        });
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR code");
    let (_meta, content) = grids[0].decode().expect("QR code must decode");
    content
}

// ── QR ───────────────────────────────────────────────────────────────────────

#[test]
fn test_qr_round_trips_url() {
    let artifact = generate(
        &QrInput::Text("https://example.com".into()),
        &QrOptions::default(),
    )
    .unwrap();
    let img = image::load_from_memory(&artifact.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (256, 256));
    assert_eq!(scan_qr(&artifact.bytes), "https://example.com");
}

#[test]
fn test_qr_is_deterministic() {
    let opts = QrOptions::default();
    let a = encode_qr("same input", &opts).unwrap();
    let b = encode_qr("same input", &opts).unwrap();
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn test_qr_keeps_surrounding_whitespace() {
    let artifact = generate(&QrInput::Text("  padded  ".into()), &QrOptions::default()).unwrap();
    assert_eq!(scan_qr(&artifact.bytes), "  padded  ");
}

#[tokio::test]
async fn test_qr_upload_limit_is_checked_before_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.png");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(DEFAULT_MAX_QR_UPLOAD_BYTES + 1).unwrap();

    let selected = SelectedFile::from_path(&path).await.unwrap();
    let err = read_qr_upload(&selected, DEFAULT_MAX_QR_UPLOAD_BYTES)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolsError::UploadTooLarge { .. }));
    assert!(err.to_string().contains("smaller than 10MB"));
}

#[tokio::test]
async fn test_qr_upload_at_limit_is_accepted() {
    let selected = SelectedFile::from_bytes("tiny.png", "image/png", vec![0x89, b'P', b'N', b'G']);
    let uri = read_qr_upload(&selected, 4).await.unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_qr_from_small_image_upload() {
    let png = noise_png(4, 4, 1);
    let mut tools = DevTools::default();
    let file = SelectedFile::from_bytes("dot.png", "image/png", png);
    tools.upload_qr_image(&file).await.unwrap();
    let artifact = tools.generate_qr().unwrap();
    assert_eq!(scan_qr(&artifact.bytes), tools.qr().input().value());
}

// ── Resize ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_resize_fits_box_and_ceiling() {
    let png = noise_png(1200, 900, 3);
    let out = resize_image("noise.png", png, ResizeParams::default(), &ResizeOptions::default())
        .await
        .unwrap();
    assert_eq!(out.width.max(out.height), 800);
    assert!(out.artifact.size_bytes() <= 1024 * 1024);
    assert_eq!(out.artifact.mime_type, "image/jpeg");
    assert_eq!(out.artifact.suggested_filename, "resized-image.jpg");
    let decoded = image::load_from_memory(&out.artifact.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (out.width, out.height));
}

#[tokio::test]
async fn test_resize_higher_quality_is_not_smaller() {
    let png = noise_png(300, 200, 5);
    let opts = ResizeOptions::default();
    let low = resize_image("n.png", png.clone(), ResizeParams::new(800, 600, 0.3), &opts)
        .await
        .unwrap();
    let high = resize_image("n.png", png, ResizeParams::new(800, 600, 0.9), &opts)
        .await
        .unwrap();
    assert!(high.artifact.size_bytes() >= low.artifact.size_bytes());
}

#[tokio::test]
async fn test_resize_rejects_non_image() {
    let err = resize_image(
        "notes.txt",
        b"plain text".to_vec(),
        ResizeParams::default(),
        &ResizeOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ToolsError::ImageDecodeFailed { .. }));
}

#[tokio::test]
async fn test_session_resize_reports_reduction() {
    init_tracing();
    let mut tools = DevTools::default();
    tools.select_tab(ToolTab::Resize);
    assert!(tools.resizer().size_report().is_none());

    tools
        .load_resize_source(png_file("photo.png", 1000, 750))
        .await
        .unwrap();
    assert!(tools.resizer().can_resize());
    tools.set_resize_params(ResizeParams::new(400, 300, 0.7)).unwrap();
    let out = tools.resize().await.unwrap();

    let report = tools.resizer().size_report().unwrap();
    assert_eq!(report, out.report);
    let expected = (report.original_bytes as f64 - report.resized_bytes as f64)
        / report.original_bytes as f64
        * 100.0;
    assert_eq!(report.format_reduction().unwrap(), format!("{:.1}%", expected));

    let dir = tempfile::tempdir().unwrap();
    let saved = tools.resizer().download(dir.path()).await.unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), out.artifact.bytes);
}

// ── Document ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_document_order_survives_read_latency() {
    init_tracing();
    let files = vec![
        text_file("a.txt", "alpha"),
        png_file("b.png", 40, 30),
        text_file("c.txt", "gamma"),
    ];
    let n = files.len() as u64;
    // Earlier files take longer to read.
    let out = assemble_with_reader(&files, &DocumentOptions::default(), None, move |index, file| async move {
        tokio::time::sleep(Duration::from_millis((n - index as u64) * 30)).await;
        file.read_bytes().await
    })
    .await
    .unwrap();

    assert_eq!(out.page_count, 3);
    let order: Vec<_> = out.placed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(order, ["a.txt", "b.png", "c.txt"]);

    let pages = page_contents(&out.artifact.bytes);
    assert_eq!(pages.len(), 3);
    assert!(pages[0].contains("(alpha) Tj"), "page 1: {}", pages[0]);
    assert!(pages[1].contains("/Im1 Do"), "page 2: {}", pages[1]);
    assert!(pages[2].contains("(gamma) Tj"), "page 3: {}", pages[2]);
}

#[tokio::test]
async fn test_document_skips_unsupported_middle_file() {
    let files = vec![
        text_file("a.txt", "first"),
        SelectedFile::from_bytes("report.docx", "application/msword", vec![1, 2, 3]),
        text_file("c.txt", "last"),
    ];
    let out = assemble(&files, &ToolsConfig::default()).await.unwrap();

    assert_eq!(out.page_count, 2);
    assert_eq!(out.skipped.len(), 1);
    assert_eq!(out.skipped[0].index, 1);
    assert_eq!(out.skipped[0].name, "report.docx");

    let pages = page_contents(&out.artifact.bytes);
    assert!(pages[0].contains("(first) Tj"));
    assert!(pages[1].contains("(last) Tj"));
}

#[tokio::test]
async fn test_document_one_page_per_supported_file() {
    let files: Vec<_> = (0..5)
        .map(|i| {
            if i % 2 == 0 {
                text_file(&format!("{i}.txt"), &format!("line {i}"))
            } else {
                png_file(&format!("{i}.png"), 20, 20)
            }
        })
        .collect();
    let out = assemble(&files, &ToolsConfig::default()).await.unwrap();
    assert_eq!(out.page_count, 5);
    assert_eq!(page_contents(&out.artifact.bytes).len(), 5);
    assert!(matches!(out.placed[1].content, PageContent::Image { width_px: 20, height_px: 20 }));
}

#[tokio::test]
async fn test_document_markdown_is_not_plain_text() {
    let files = vec![SelectedFile::from_bytes("notes.md", "text/markdown", b"# hi".to_vec())];
    let out = assemble(&files, &ToolsConfig::default()).await.unwrap();
    // Nothing placed: a single blank page.
    assert_eq!(out.page_count, 1);
    assert!(out.placed.is_empty());
    assert_eq!(out.skipped.len(), 1);
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl DocumentProgressCallback for RecordingCallback {
    fn on_assembly_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }

    fn on_file_placed(&self, index: usize, _total: usize, name: &str) {
        self.events.lock().unwrap().push(format!("placed {index} {name}"));
    }

    fn on_file_skipped(&self, index: usize, _total: usize, name: &str, _mime_type: &str) {
        self.events.lock().unwrap().push(format!("skipped {index} {name}"));
    }

    fn on_assembly_complete(&self, _total_files: usize, page_count: usize) {
        self.events.lock().unwrap().push(format!("done {page_count}"));
    }
}

#[tokio::test]
async fn test_document_progress_events_in_selection_order() {
    let recorder = Arc::new(RecordingCallback::default());
    let config = ToolsConfig::builder()
        .read_concurrency(3)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let files = vec![
        text_file("a.txt", "a"),
        SelectedFile::from_bytes("b.bin", "application/octet-stream", vec![0]),
        text_file("c.txt", "c"),
    ];
    assemble(&files, &config).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        ["start 3", "placed 0 a.txt", "skipped 1 b.bin", "placed 2 c.txt", "done 2"]
    );
}

#[tokio::test]
async fn test_session_pdf_from_disk() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    let png = dir.path().join("pic.png");
    std::fs::write(&txt, "hello from disk").unwrap();
    std::fs::write(&png, noise_png(64, 48, 9)).unwrap();

    let mut tools = DevTools::default();
    tools.select_tab(ToolTab::Document);
    let files = vec![
        SelectedFile::from_path(&png).await.unwrap(),
        SelectedFile::from_path(&txt).await.unwrap(),
    ];
    tools.select_documents(files).unwrap();
    assert!(tools.documents().can_convert());
    assert_eq!(tools.documents().labels()[1], "notes.txt (0.0 KB)");

    let out = tools.convert_documents().await.unwrap();
    assert_eq!(out.page_count, 2);

    let out_dir = dir.path().join("out");
    let saved = tools.documents().download(&out_dir).await.unwrap();
    assert_eq!(saved, out_dir.join("converted-document.pdf"));
    let pages = page_contents(&std::fs::read(saved).unwrap());
    assert!(pages[0].contains("/Im0 Do"));
    assert!(pages[1].contains("(hello from disk) Tj"));
}

// ── Session ──────────────────────────────────────────────────────────────────

#[test]
fn test_tabs_are_exclusive() {
    let mut tools = DevTools::default();
    for tab in ToolTab::ALL {
        tools.select_tab(tab);
        let active = ToolTab::ALL
            .iter()
            .filter(|t| tools.view().is_active(**t))
            .count();
        assert_eq!(active, 1);
    }
    // Resize is not active, so its controls are refused.
    tools.select_tab(ToolTab::Qr);
    assert!(matches!(
        tools.set_resize_params(ResizeParams::default()),
        Err(ToolsError::ToolNotActive { tool: "resize" })
    ));
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<portfolio_devtools::NoopProgressCallback>();
    assert_send_sync::<ToolsConfig>();
}
