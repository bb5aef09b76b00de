//! Input resolution and validation shared by the three pipelines.
//!
//! A [`SelectedFile`] is what a file picker hands over: a display name, a MIME
//! type, a size, and a way to get the bytes. The MIME type is inferred from the
//! extension, which is as advisory as a browser's `accept` filter; pipelines
//! decide what to do with a file by comparing MIME strings, and the image
//! decoder has the final word on whether an "image" really is one.
//!
//! Sizes come from file metadata at selection time so the QR upload limit can
//! be enforced before a single byte is read.

use crate::artifact::encode_data_uri;
use crate::error::ToolsError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a selected file's bytes live.
#[derive(Debug, Clone)]
pub enum FileContents {
    /// Read lazily from disk.
    OnDisk(PathBuf),
    /// Already in memory (library callers, tests).
    InMemory(Vec<u8>),
}

/// One file chosen by the user.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub contents: FileContents,
}

impl SelectedFile {
    /// Select a file on disk, validating that it exists and is readable.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ToolsError> {
        let path = path.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io_error(&path, e))?;
        if !meta.is_file() {
            return Err(ToolsError::FileNotFound { path });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_path(&path).to_string();
        debug!("Selected {} ({}, {} bytes)", name, mime_type, meta.len());

        Ok(Self {
            name,
            mime_type,
            size_bytes: meta.len(),
            contents: FileContents::OnDisk(path),
        })
    }

    /// Wrap bytes that are already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            contents: FileContents::InMemory(bytes),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Exactly `text/plain`; `text/markdown` and friends do not qualify.
    pub fn is_plain_text(&self) -> bool {
        self.mime_type == "text/plain"
    }

    /// Read the whole file.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, ToolsError> {
        match &self.contents {
            FileContents::InMemory(bytes) => Ok(bytes.clone()),
            FileContents::OnDisk(path) => tokio::fs::read(path)
                .await
                .map_err(|e| map_io_error(path, e)),
        }
    }

    /// Read the file as UTF-8 text, replacing invalid sequences with U+FFFD.
    pub async fn read_text(&self) -> Result<String, ToolsError> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the file as a base64 `data:` URI.
    pub async fn read_data_uri(&self) -> Result<String, ToolsError> {
        let bytes = self.read_bytes().await?;
        Ok(encode_data_uri(&self.mime_type, &bytes))
    }

    /// `"photo.png (12.3 KB)"`, as shown in the file list.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, format_kb(self.size_bytes))
    }
}

/// Infer a MIME type from a path's extension.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Return the trimmed text, or [`ToolsError::EmptyQrInput`] if nothing is left.
pub fn require_content(value: &str) -> Result<&str, ToolsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ToolsError::EmptyQrInput)
    } else {
        Ok(trimmed)
    }
}

/// Reject files larger than `limit` bytes. A file of exactly `limit` passes.
pub fn check_upload_size(size: u64, limit: u64) -> Result<(), ToolsError> {
    if size > limit {
        Err(ToolsError::UploadTooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// Validate and read a QR image upload into a `data:` URI.
///
/// The size check happens before any read.
pub async fn read_qr_upload(file: &SelectedFile, limit: u64) -> Result<String, ToolsError> {
    check_upload_size(file.size_bytes, limit)?;
    file.read_data_uri().await
}

/// Kilobytes with one decimal place: `"12.3 KB"`.
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn map_io_error(path: &Path, e: std::io::Error) -> ToolsError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ToolsError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ToolsError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ToolsError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    }
}
