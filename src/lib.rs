//! # portfolio-devtools
//!
//! Three small local file transformations from a portfolio site's Tools page:
//! a QR code generator, an image resizer and an images/text → PDF converter.
//!
//! ## Why a library?
//!
//! Nothing here needs a network or a browser. Each tool is a pure transform
//! from user input to a downloadable [`Artifact`], so the same code backs the
//! `devtools` CLI, a UI layer, and the tests.
//!
//! ## Pipeline Overview
//!
//! ```text
//! DevTools session (active tab, theme)
//!  │
//!  ├─ QR        text or image data URI ──▶ 256×256 PNG        qrcode.png
//!  ├─ Resize    image + w/h/quality     ──▶ JPEG ≤ 1 MB        resized-image.jpg
//!  └─ Document  ordered images / .txt   ──▶ A4 PDF, 1 page/file converted-document.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use portfolio_devtools::{DevTools, SelectedFile, ToolTab, ToolsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tools = DevTools::new(ToolsConfig::default());
//!
//!     tools.set_qr_text("https://example.com")?;
//!     tools.generate_qr()?;
//!     tools.qr().download("out").await?;
//!
//!     tools.select_tab(ToolTab::Document);
//!     let files = vec![
//!         SelectedFile::from_path("cover.png").await?,
//!         SelectedFile::from_path("notes.txt").await?,
//!     ];
//!     tools.select_documents(files)?;
//!     let pdf = tools.convert_documents().await?;
//!     eprintln!("{} pages", pdf.page_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `devtools` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! portfolio-devtools = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod tools;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{Artifact, DOCUMENT_FILENAME, QR_FILENAME, RESIZED_FILENAME};
pub use config::{
    DocumentOptions, HexColor, QrEcLevel, QrOptions, ResizeOptions, ToolsConfig, ToolsConfigBuilder,
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_MAX_QR_UPLOAD_BYTES,
};
pub use error::{SkippedFile, ToolsError};
pub use pipeline::document::{DocumentOutput, PageContent, PlacedPage};
pub use pipeline::input::SelectedFile;
pub use pipeline::qr::{QrInput, QrInputKind};
pub use pipeline::resize::{ResizeOutput, ResizeParams, SizeReport};
pub use pipeline::PipelineState;
pub use progress::{DocumentProgressCallback, NoopProgressCallback, ProgressCallback};
pub use tools::{DevTools, DocumentTool, QrTool, ResizeTool, SourceImage};
pub use view::{Theme, ToolTab, ToolsView};
