//! Error types for the portfolio-devtools library.
//!
//! Two distinct types reflect two distinct outcomes:
//!
//! * [`ToolsError`] — **Fatal** for one pipeline run: the QR code, resized
//!   image or PDF cannot be produced (empty input, oversized upload, corrupt
//!   image, unwritable output). Returned as `Err(ToolsError)` and recorded as
//!   [`crate::pipeline::PipelineState::Failed`] by the tools session.
//!
//! * [`SkippedFile`] — **Non-fatal**: document assembly met a file whose MIME
//!   type is neither an image nor `text/plain`. The file contributes no page,
//!   the run still succeeds, and the notice travels with
//!   [`crate::pipeline::document::DocumentOutput`].
//!
//! No error is fatal to the process and nothing is retried automatically.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the portfolio-devtools library.
#[derive(Debug, Error)]
pub enum ToolsError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// QR input was empty or whitespace only.
    #[error("Please enter some content to generate QR code")]
    EmptyQrInput,

    /// QR image upload exceeded the configured size limit.
    #[error("File size too large. Please select an image smaller than {}MB.", .limit / (1024 * 1024))]
    UploadTooLarge { size: u64, limit: u64 },

    /// Document conversion was requested with no files selected.
    #[error("No files selected for conversion")]
    NoDocuments,

    /// Resize was requested before a source image was loaded.
    #[error("No source image loaded; upload an image before resizing")]
    NoSourceImage,

    /// Download requested before the tool produced anything.
    #[error("Nothing to download yet from the {tool} tool")]
    NothingToDownload { tool: &'static str },

    /// A tool was driven while another tool's tab is active.
    #[error("The {tool} tool is not the active tab")]
    ToolNotActive { tool: &'static str },

    /// The pipeline is already running; a second trigger is refused.
    #[error("The {tool} tool is already running")]
    Busy { tool: &'static str },

    // ── Transform errors ──────────────────────────────────────────────────
    /// The QR encoder rejected the payload (usually too long for a symbol).
    #[error(
        "Failed to generate QR code. The content may be too large. \
Try a smaller image or use text/URL instead. ({reason})"
    )]
    QrEncodeFailed { reason: String },

    /// A source image could not be decoded.
    #[error("Could not decode image '{name}': {detail}")]
    ImageDecodeFailed { name: String, detail: String },

    /// The resize transform could not produce an image under the size ceiling.
    #[error("Image resize failed: {detail}")]
    ResizeFailed { detail: String },

    /// An image selected for the PDF could not be decoded or embedded.
    #[error("Could not embed image '{name}' (file {index}): {detail}")]
    DocumentImageFailed {
        index: usize,
        name: String,
        detail: String,
    },

    /// A file selected for the PDF could not be read.
    #[error("Could not read '{name}' (file {index}): {detail}")]
    DocumentReadFailed {
        index: usize,
        name: String,
        detail: String,
    },

    /// lopdf failed to serialise the assembled document.
    #[error("Failed to write PDF: {0}")]
    PdfWriteFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other read failure.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `data:` URI could not be parsed.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A file left out of an assembled PDF because of its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// 0-based position in the selection.
    pub index: usize,
    pub name: String,
    pub mime_type: String,
}

impl std::fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "skipped '{}': unsupported type {}",
            self.name,
            if self.mime_type.is_empty() {
                "(unknown)"
            } else {
                self.mime_type.as_str()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_too_large_mentions_limit_in_mb() {
        let e = ToolsError::UploadTooLarge {
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(
            e.to_string(),
            "File size too large. Please select an image smaller than 10MB."
        );
    }

    #[test]
    fn qr_encode_failure_suggests_alternatives() {
        let e = ToolsError::QrEncodeFailed {
            reason: "data too long".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("smaller image"), "got: {msg}");
        assert!(msg.contains("text/URL"), "got: {msg}");
    }

    #[test]
    fn busy_names_the_tool() {
        let e = ToolsError::Busy { tool: "resize" };
        assert!(e.to_string().contains("resize"));
    }

    #[test]
    fn skipped_file_display() {
        let s = SkippedFile {
            index: 2,
            name: "notes.docx".into(),
            mime_type: String::new(),
        };
        assert_eq!(s.to_string(), "skipped 'notes.docx': unsupported type (unknown)");
    }
}
