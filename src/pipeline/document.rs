//! Document assembly pipeline: ordered images and text files → one PDF.
//!
//! ## Page policy
//!
//! A new document starts with one blank page. The file at selection index 0
//! is drawn on it; every later supported file first adds a page and then
//! draws. The rule is keyed on the selection index, not on how many pages
//! have been drawn, so an unsupported first file leaves page 1 blank.
//! Unsupported files (neither `image/*` nor exactly `text/plain`) add nothing
//! and are reported as [`SkippedFile`]s.
//!
//! ## Ordering
//!
//! Reads are issued up to `read_concurrency` at a time, but
//! [`StreamExt::buffered`] yields them in selection order and placement is a
//! plain sequential loop, so page order always equals selection order no
//! matter which read finishes first.
//!
//! ## Atomicity
//!
//! Any read or decode error aborts the whole run; the partially built
//! document is dropped and nothing is returned.

use crate::artifact::{Artifact, DOCUMENT_FILENAME};
use crate::config::{DocumentOptions, ToolsConfig};
use crate::error::{SkippedFile, ToolsError};
use crate::pipeline::input::SelectedFile;
use crate::pipeline::resize::flatten_onto_white;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info, warn};

const PT_PER_MM: f32 = 72.0 / 25.4;
const FONT_RESOURCE: &str = "F1";

/// What ended up on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Image { width_px: u32, height_px: u32 },
    Text { lines: usize },
}

/// One drawn page and the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedPage {
    /// 1-based page number in the output.
    pub page: usize,
    /// 0-based position of the source file in the selection.
    pub index: usize,
    pub name: String,
    pub content: PageContent,
}

/// Result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutput {
    pub artifact: Artifact,
    pub page_count: usize,
    pub placed: Vec<PlacedPage>,
    pub skipped: Vec<SkippedFile>,
}

/// Assemble `files` into a PDF, reading each file with [`SelectedFile::read_bytes`].
pub async fn assemble(
    files: &[SelectedFile],
    config: &ToolsConfig,
) -> Result<DocumentOutput, ToolsError> {
    assemble_with_reader(
        files,
        &config.document,
        config.progress_callback.as_ref(),
        |_, file| async move { file.read_bytes().await },
    )
    .await
}

/// Assemble `files` into a PDF using a caller-supplied reader.
///
/// `read` receives the selection index and a clone of the file. Files with
/// unsupported MIME types are never read.
pub async fn assemble_with_reader<F, Fut>(
    files: &[SelectedFile],
    options: &DocumentOptions,
    progress: Option<&ProgressCallback>,
    read: F,
) -> Result<DocumentOutput, ToolsError>
where
    F: Fn(usize, SelectedFile) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, ToolsError>>,
{
    if files.is_empty() {
        return Err(ToolsError::NoDocuments);
    }
    let total = files.len();
    info!("Assembling PDF from {} files", total);
    if let Some(cb) = progress {
        cb.on_assembly_start(total);
    }

    let mut reads = Box::pin(
        stream::iter(files.iter().cloned().enumerate())
            .map(|(index, file)| {
                let pending = is_supported(&file).then(|| read(index, file));
                let cb = progress.cloned();
                async move {
                    match pending {
                        Some(fut) => {
                            let bytes = fut.await?;
                            if let Some(cb) = cb {
                                cb.on_file_read(index, total, bytes.len() as u64);
                            }
                            Ok::<_, ToolsError>(Some(bytes))
                        }
                        None => Ok(None),
                    }
                }
            })
            .buffered(options.read_concurrency.max(1)),
    );

    let mut pdf = PdfBuilder::new(options);
    let mut placed = Vec::new();
    let mut skipped = Vec::new();
    let mut index = 0usize;

    while let Some(read_result) = reads.next().await {
        let file = &files[index];
        let bytes: Option<Vec<u8>> =
            read_result.map_err(|e| ToolsError::DocumentReadFailed {
                index,
                name: file.name.clone(),
                detail: e.to_string(),
            })?;

        match bytes {
            None => {
                warn!(
                    "Skipping '{}': unsupported type '{}'",
                    file.name, file.mime_type
                );
                if let Some(cb) = progress {
                    cb.on_file_skipped(index, total, &file.name, &file.mime_type);
                }
                skipped.push(SkippedFile {
                    index,
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                });
            }
            Some(bytes) => {
                let content = if file.is_image() {
                    let prepared = prepare_image(index, &file.name, bytes, options).await?;
                    if index > 0 {
                        pdf.add_page();
                    }
                    pdf.draw_image(index, &prepared)
                } else {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    if index > 0 {
                        pdf.add_page();
                    }
                    pdf.draw_text(&text)
                };
                debug!("Placed '{}' on page {}", file.name, pdf.page_count());
                placed.push(PlacedPage {
                    page: pdf.page_count(),
                    index,
                    name: file.name.clone(),
                    content,
                });
                if let Some(cb) = progress {
                    cb.on_file_placed(index, total, &file.name);
                }
            }
        }
        index += 1;
    }

    let page_count = pdf.page_count();
    let bytes = pdf.finish()?;
    info!(
        "PDF assembled: {} pages, {} skipped, {} bytes",
        page_count,
        skipped.len(),
        bytes.len()
    );
    if let Some(cb) = progress {
        cb.on_assembly_complete(total, page_count);
    }

    Ok(DocumentOutput {
        artifact: Artifact::new("application/pdf", bytes, DOCUMENT_FILENAME),
        page_count,
        placed,
        skipped,
    })
}

fn is_supported(file: &SelectedFile) -> bool {
    file.is_image() || file.is_plain_text()
}

/// An image decoded and re-encoded as baseline JPEG for a DCT XObject.
struct PreparedImage {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

async fn prepare_image(
    index: usize,
    name: &str,
    bytes: Vec<u8>,
    options: &DocumentOptions,
) -> Result<PreparedImage, ToolsError> {
    let quality = options.embed_jpeg_quality.clamp(1, 100);
    let task_name = name.to_string();

    tokio::task::spawn_blocking(move || -> Result<PreparedImage, String> {
        let img = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
        let (width, height) = img.dimensions();
        let rgb = DynamicImage::ImageRgb8(flatten_onto_white(&img));
        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
            .map_err(|e| e.to_string())?;
        debug!("Prepared '{}' {}x{} → {} bytes JPEG", task_name, width, height, jpeg.len());
        Ok(PreparedImage {
            width,
            height,
            jpeg,
        })
    })
    .await
    .map_err(|e| ToolsError::Internal(format!("Image task panicked: {}", e)))?
    .map_err(|detail| ToolsError::DocumentImageFailed {
        index,
        name: name.to_string(),
        detail,
    })
}

/// One page under construction.
#[derive(Default)]
struct PageDraft {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// Minimal PDF writer: Helvetica text and DCT images on fixed-size pages.
struct PdfBuilder<'a> {
    options: &'a DocumentOptions,
    doc: Document,
    pages: Vec<PageDraft>,
}

impl<'a> PdfBuilder<'a> {
    fn new(options: &'a DocumentOptions) -> Self {
        Self {
            options,
            doc: Document::with_version("1.5"),
            pages: vec![PageDraft::default()],
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_height_pt(&self) -> f32 {
        self.options.page_height_mm * PT_PER_MM
    }

    fn current(&mut self) -> &mut PageDraft {
        // `pages` always holds at least the initial page.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn add_page(&mut self) {
        self.pages.push(PageDraft::default());
    }

    /// Draw at the margin, `image_width_mm` wide, height by aspect ratio.
    fn draw_image(&mut self, index: usize, image: &PreparedImage) -> PageContent {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            image.jpeg.clone(),
        )
        .with_compression(false);
        let image_id = self.doc.add_object(stream);

        let width_pt = self.options.image_width_mm * PT_PER_MM;
        let height_pt = width_pt * image.height as f32 / image.width.max(1) as f32;
        let x = self.options.margin_mm * PT_PER_MM;
        let y = self.page_height_pt() - self.options.margin_mm * PT_PER_MM - height_pt;
        let resource = format!("Im{index}");

        let page = self.current();
        page.xobjects.set(resource.as_bytes().to_vec(), Object::Reference(image_id));
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width_pt.into(),
                    0f32.into(),
                    0f32.into(),
                    height_pt.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(resource.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        PageContent::Image {
            width_px: image.width,
            height_px: image.height,
        }
    }

    /// Draw `text` with its first baseline at the margin. No wrapping.
    fn draw_text(&mut self, text: &str) -> PageContent {
        let size = self.options.font_size_pt;
        let leading = size * self.options.line_height_factor;
        let x = self.options.margin_mm * PT_PER_MM;
        let y = self.page_height_pt() - self.options.margin_mm * PT_PER_MM;
        let normalised = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = normalised.split('\n').collect();

        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_RESOURCE.into()), size.into()]),
            Operation::new("TL", vec![leading.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi_bytes(line), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
        self.current().operations.extend(ops);

        PageContent::Text { lines: lines.len() }
    }

    fn finish(mut self) -> Result<Vec<u8>, ToolsError> {
        let page_w = self.options.page_width_mm * PT_PER_MM;
        let page_h = self.page_height_pt();
        let pages_id = self.doc.new_object_id();
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for draft in std::mem::take(&mut self.pages) {
            let content = Content {
                operations: draft.operations,
            };
            let encoded = content
                .encode()
                .map_err(|e| ToolsError::PdfWriteFailed(e.to_string()))?;
            let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0f32.into(), 0f32.into(), page_w.into(), page_h.into()],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_RESOURCE => font_id },
                    "XObject" => draft.xobjects,
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal("portfolio-devtools"),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| ToolsError::PdfWriteFailed(e.to_string()))?;
        Ok(buf)
    }
}

/// Encode for Helvetica/WinAnsi: Latin-1 printable characters pass through,
/// tabs become spaces, anything else becomes `?`.
fn win_ansi_bytes(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c as u32 {
            0x09 => b' ',
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}
