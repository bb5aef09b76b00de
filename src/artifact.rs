//! Produced artifacts and the `data:` URI codec.
//!
//! Every pipeline ends in an [`Artifact`]: bytes, a MIME type and the fixed
//! filename the Tools page offers for download. The same bytes are exposed as
//! a base64 `data:` URI for inline preview, and saved to disk with an atomic
//! temp-file-then-rename write so an interrupted save never leaves a truncated
//! `qrcode.png` behind.

use crate::error::ToolsError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Download name of the QR pipeline's output.
pub const QR_FILENAME: &str = "qrcode.png";
/// Download name of the resize pipeline's output.
pub const RESIZED_FILENAME: &str = "resized-image.jpg";
/// Download name of the document assembly pipeline's output.
pub const DOCUMENT_FILENAME: &str = "converted-document.pdf";

/// A finished, downloadable pipeline output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
}

impl Artifact {
    pub fn new(
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        suggested_filename: impl Into<String>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
            suggested_filename: suggested_filename.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Base64 `data:` URI of the artifact, suitable for an `<img src>`.
    pub fn to_data_uri(&self) -> String {
        encode_data_uri(&self.mime_type, &self.bytes)
    }

    /// Write the artifact into `dir` under its suggested filename.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    /// Returns the final path.
    pub async fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ToolsError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.suggested_filename);

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ToolsError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        let tmp_path = dir.join(format!(".{}.tmp", self.suggested_filename));
        tokio::fs::write(&tmp_path, &self.bytes)
            .await
            .map_err(|e| ToolsError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ToolsError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Wrap bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    format!("data:{mime_type};base64,{b64}")
}

/// Split a base64 `data:` URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ToolsError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| ToolsError::InvalidDataUri("missing 'data:' prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ToolsError::InvalidDataUri("missing ',' separator".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ToolsError::InvalidDataUri("only base64 payloads are supported".into()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ToolsError::InvalidDataUri(e.to_string()))?;
    Ok((mime.to_string(), bytes))
}
