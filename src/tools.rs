//! The Tools page as a session object.
//!
//! [`DevTools`] owns the configuration, the view state and one tool per tab.
//! Each tool keeps its own input, its own [`PipelineState`] and its own
//! result; none of them can see the others.
//!
//! ## Why gate on the active tab?
//!
//! On the page only the visible tab's controls can be used. The session
//! enforces the same rule: driving a tool whose tab is not active returns
//! [`ToolsError::ToolNotActive`]. Switching tabs keeps every tool's state, so
//! coming back to a tab shows what was there before.

use crate::artifact::{encode_data_uri, Artifact};
use crate::config::{QrOptions, ToolsConfig};
use crate::error::ToolsError;
use crate::pipeline::document::{self, DocumentOutput};
use crate::pipeline::input::{format_kb, read_qr_upload, SelectedFile};
use crate::pipeline::qr::{self, QrInput, QrInputKind};
use crate::pipeline::resize::{self, ResizeOutput, ResizeParams, SizeReport};
use crate::pipeline::PipelineState;
use crate::view::{Theme, ToolTab, ToolsView};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

// ── Session ──────────────────────────────────────────────────────────────

/// One visit to the Tools page.
#[derive(Debug)]
pub struct DevTools {
    config: ToolsConfig,
    view: ToolsView,
    qr: QrTool,
    resize: ResizeTool,
    document: DocumentTool,
}

impl Default for DevTools {
    fn default() -> Self {
        Self::new(ToolsConfig::default())
    }
}

impl DevTools {
    /// Start a session on the QR tab. The sample QR code is rendered here.
    pub fn new(config: ToolsConfig) -> Self {
        let qr = QrTool::new(&config.qr);
        Self {
            config,
            view: ToolsView::default(),
            qr,
            resize: ResizeTool::default(),
            document: DocumentTool::default(),
        }
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }

    pub fn view(&self) -> &ToolsView {
        &self.view
    }

    pub fn qr(&self) -> &QrTool {
        &self.qr
    }

    pub fn resizer(&self) -> &ResizeTool {
        &self.resize
    }

    pub fn documents(&self) -> &DocumentTool {
        &self.document
    }

    pub fn select_tab(&mut self, tab: ToolTab) {
        if let Some(previous) = self.view.select(tab) {
            debug!("Tab {} → {}", previous.key(), tab.key());
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.view.toggle_theme()
    }

    fn require_active(&self, tab: ToolTab) -> Result<(), ToolsError> {
        if self.view.is_active(tab) {
            Ok(())
        } else {
            Err(ToolsError::ToolNotActive { tool: tab.key() })
        }
    }

    // ── QR ───────────────────────────────────────────────────────────────

    pub fn set_qr_text(&mut self, text: impl Into<String>) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Qr)?;
        self.qr.set_text(text);
        Ok(())
    }

    pub fn set_qr_input_kind(&mut self, kind: QrInputKind) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Qr)?;
        self.qr.set_kind(kind);
        Ok(())
    }

    pub async fn upload_qr_image(&mut self, file: &SelectedFile) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Qr)?;
        let limit = self.config.max_qr_upload_bytes;
        self.qr.upload_image(file, limit).await
    }

    pub fn generate_qr(&mut self) -> Result<Artifact, ToolsError> {
        self.require_active(ToolTab::Qr)?;
        self.qr.generate(&self.config.qr)
    }

    // ── Resize ───────────────────────────────────────────────────────────

    pub async fn load_resize_source(&mut self, file: SelectedFile) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Resize)?;
        self.resize.load_source(file).await
    }

    pub fn set_resize_params(&mut self, params: ResizeParams) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Resize)?;
        self.resize.set_params(params);
        Ok(())
    }

    pub async fn resize(&mut self) -> Result<ResizeOutput, ToolsError> {
        self.require_active(ToolTab::Resize)?;
        self.resize.resize(&self.config).await
    }

    // ── Document ─────────────────────────────────────────────────────────

    pub fn select_documents(&mut self, files: Vec<SelectedFile>) -> Result<(), ToolsError> {
        self.require_active(ToolTab::Document)?;
        self.document.select_files(files);
        Ok(())
    }

    pub async fn convert_documents(&mut self) -> Result<DocumentOutput, ToolsError> {
        self.require_active(ToolTab::Document)?;
        self.document.convert(&self.config).await
    }
}

// ── QR tool ──────────────────────────────────────────────────────────────

/// QR generator state.
///
/// `displayed` is whatever QR code is currently shown, the sample one
/// included; it only changes on a successful generation.
#[derive(Debug, Default)]
pub struct QrTool {
    input: QrInput,
    preview: Option<String>,
    displayed: Option<Artifact>,
    state: PipelineState<Artifact>,
}

impl QrTool {
    fn new(options: &QrOptions) -> Self {
        let displayed = match qr::sample(options) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!("Sample QR code could not be rendered: {}", e);
                None
            }
        };
        Self {
            displayed,
            ..Self::default()
        }
    }

    pub fn input(&self) -> &QrInput {
        &self.input
    }

    /// Data URI of the uploaded image, for the preview thumbnail.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn displayed(&self) -> Option<&Artifact> {
        self.displayed.as_ref()
    }

    pub fn state(&self) -> &PipelineState<Artifact> {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.input = QrInput::Text(text.into());
    }

    pub fn set_kind(&mut self, kind: QrInputKind) {
        let current = std::mem::take(&mut self.input);
        self.input = current.with_kind(kind);
    }

    /// Load an image as the QR payload.
    ///
    /// An oversized file is refused before it is read; the previous input and
    /// the displayed QR code stay as they were.
    pub async fn upload_image(&mut self, file: &SelectedFile, limit: u64) -> Result<(), ToolsError> {
        match read_qr_upload(file, limit).await {
            Ok(uri) => {
                debug!("QR payload from {} ({} chars)", file.name, uri.len());
                self.preview = Some(uri.clone());
                self.input = QrInput::Image(uri);
                if self.state.error().is_some() {
                    self.state.reset();
                }
                Ok(())
            }
            Err(e) => {
                warn!("QR upload of {} refused: {}", file.name, e);
                self.state.fail(&e);
                Err(e)
            }
        }
    }

    pub fn generate(&mut self, options: &QrOptions) -> Result<Artifact, ToolsError> {
        self.state.begin(ToolTab::Qr.key())?;
        let outcome = qr::generate(&self.input, options);
        self.state.finish(&outcome);
        match outcome {
            Ok(artifact) => {
                info!("QR code generated ({} bytes)", artifact.size_bytes());
                self.displayed = Some(artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                error!("QR generation failed: {}", e);
                Err(e)
            }
        }
    }

    /// Save the displayed QR code as `qrcode.png` in `dir`.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ToolsError> {
        let artifact = self
            .displayed
            .as_ref()
            .ok_or(ToolsError::NothingToDownload { tool: ToolTab::Qr.key() })?;
        artifact.save_in(dir).await
    }
}

// ── Resize tool ──────────────────────────────────────────────────────────

/// The image loaded into the resizer.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub file: SelectedFile,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn preview_data_uri(&self) -> String {
        encode_data_uri(&self.file.mime_type, &self.bytes)
    }

    /// `"Original: 12.3 KB"`
    pub fn size_label(&self) -> String {
        format!("Original: {}", format_kb(self.bytes.len() as u64))
    }
}

#[derive(Debug, Default)]
pub struct ResizeTool {
    source: Option<SourceImage>,
    params: ResizeParams,
    state: PipelineState<ResizeOutput>,
}

impl ResizeTool {
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn params(&self) -> ResizeParams {
        self.params
    }

    pub fn state(&self) -> &PipelineState<ResizeOutput> {
        &self.state
    }

    pub fn output(&self) -> Option<&ResizeOutput> {
        self.state.output()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Sizes of the current source and result, once both exist.
    pub fn size_report(&self) -> Option<SizeReport> {
        self.state.output().map(|out| out.report)
    }

    /// A source is loaded and no resize is in flight.
    pub fn can_resize(&self) -> bool {
        self.source.is_some() && !self.state.is_running()
    }

    pub fn set_params(&mut self, params: ResizeParams) {
        self.params = params;
    }

    /// Replace the source image. Any previous result is discarded.
    pub async fn load_source(&mut self, file: SelectedFile) -> Result<(), ToolsError> {
        let bytes = match file.read_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Could not read {}: {}", file.name, e);
                self.state.fail(&e);
                return Err(e);
            }
        };
        debug!("Resize source {} ({} bytes)", file.name, bytes.len());
        self.source = Some(SourceImage { file, bytes });
        self.state.reset();
        Ok(())
    }

    pub async fn resize(&mut self, config: &ToolsConfig) -> Result<ResizeOutput, ToolsError> {
        let Some(source) = self.source.as_ref() else {
            let e = ToolsError::NoSourceImage;
            self.state.fail(&e);
            return Err(e);
        };
        let run = self.state.start(ToolTab::Resize.key())?;

        let outcome = resize::resize_image(
            &source.file.name,
            source.bytes.clone(),
            self.params,
            &config.resize,
        )
        .await;
        run.finish(&outcome);

        if let Err(e) = &outcome {
            error!("Resize of {} failed: {}", source.file.name, e);
        }
        outcome
    }

    /// Save the result as `resized-image.jpg` in `dir`.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ToolsError> {
        let out = self
            .state
            .output()
            .ok_or(ToolsError::NothingToDownload { tool: ToolTab::Resize.key() })?;
        out.artifact.save_in(dir).await
    }
}

// ── Document tool ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DocumentTool {
    files: Vec<SelectedFile>,
    state: PipelineState<DocumentOutput>,
}

impl DocumentTool {
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    /// `"name (X.X KB)"` per selected file, in selection order.
    pub fn labels(&self) -> Vec<String> {
        self.files.iter().map(SelectedFile::display_label).collect()
    }

    pub fn state(&self) -> &PipelineState<DocumentOutput> {
        &self.state
    }

    pub fn output(&self) -> Option<&DocumentOutput> {
        self.state.output()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// At least one file is selected and no conversion is in flight.
    pub fn can_convert(&self) -> bool {
        !self.files.is_empty() && !self.state.is_running()
    }

    /// Replace the selection. Any previous PDF is discarded.
    pub fn select_files(&mut self, files: Vec<SelectedFile>) {
        debug!("{} files selected for PDF", files.len());
        self.files = files;
        self.state.reset();
    }

    pub async fn convert(&mut self, config: &ToolsConfig) -> Result<DocumentOutput, ToolsError> {
        if self.files.is_empty() {
            let e = ToolsError::NoDocuments;
            self.state.fail(&e);
            return Err(e);
        }
        let run = self.state.start(ToolTab::Document.key())?;

        let outcome = document::assemble(&self.files, config).await;
        run.finish(&outcome);

        match &outcome {
            Ok(out) => {
                for notice in &out.skipped {
                    warn!("{}", notice);
                }
                info!("PDF ready: {} pages, {} bytes", out.page_count, out.artifact.size_bytes());
            }
            Err(e) => error!("PDF conversion failed: {}", e),
        }
        outcome
    }

    /// Save the PDF as `converted-document.pdf` in `dir`.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ToolsError> {
        let out = self
            .state
            .output()
            .ok_or(ToolsError::NothingToDownload { tool: ToolTab::Document.key() })?;
        out.artifact.save_in(dir).await
    }
}
