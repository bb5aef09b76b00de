//! QR pipeline: text or image data URI → PNG raster.
//!
//! The matrix comes from the `qrcode` crate; rasterisation is done here with
//! `image` so the output geometry matches the usual browser QR renderers
//! exactly: a requested width of 256 px with a 2-module margin gives a module
//! size of `256 / (n + 4)` px, with each pixel mapped back to the module it
//! falls in. The side is `floor((n + 4) * scale)`, so float rounding makes it
//! 255 px instead of 256 for some versions (7 and 35 at the default width).
//!
//! Error-correction level L is the default. It lets the largest payloads fit
//! (an embedded image data URI is long) at the cost of scan robustness.

use crate::artifact::{Artifact, QR_FILENAME};
use crate::config::{QrEcLevel, QrOptions};
use crate::error::ToolsError;
use crate::pipeline::input::require_content;
use image::{ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, warn};

/// Placeholder payload rendered when the tools session starts.
pub const SAMPLE_PAYLOAD: &str = "Welcome to Developer Tools!";

/// Error-correction level of the placeholder.
pub const SAMPLE_EC_LEVEL: QrEcLevel = QrEcLevel::Medium;

/// Module size used when the requested width cannot hold the symbol.
const FALLBACK_SCALE: f64 = 4.0;

/// What the QR code should carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QrInput {
    /// Free text or a URL.
    Text(String),
    /// A base64 `data:` URI of an uploaded image.
    Image(String),
}

impl Default for QrInput {
    fn default() -> Self {
        QrInput::Text(String::new())
    }
}

/// Which input control is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QrInputKind {
    #[default]
    Text,
    Image,
}

impl QrInput {
    pub fn value(&self) -> &str {
        match self {
            QrInput::Text(s) | QrInput::Image(s) => s,
        }
    }

    pub fn kind(&self) -> QrInputKind {
        match self {
            QrInput::Text(_) => QrInputKind::Text,
            QrInput::Image(_) => QrInputKind::Image,
        }
    }

    /// Switch the input kind, keeping the current value.
    pub fn with_kind(self, kind: QrInputKind) -> QrInput {
        let value = match self {
            QrInput::Text(s) | QrInput::Image(s) => s,
        };
        match kind {
            QrInputKind::Text => QrInput::Text(value),
            QrInputKind::Image => QrInput::Image(value),
        }
    }
}

/// Encode `input` as a QR PNG.
///
/// Fails with [`ToolsError::EmptyQrInput`] before touching the encoder when the
/// trimmed value is empty.
pub fn generate(input: &QrInput, options: &QrOptions) -> Result<Artifact, ToolsError> {
    require_content(input.value())?;
    // The payload itself is not trimmed; only the emptiness check is.
    encode_qr(input.value(), options)
}

/// Encode an arbitrary payload as a QR PNG.
pub fn encode_qr(payload: &str, options: &QrOptions) -> Result<Artifact, ToolsError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), ec_level(options.error_correction))
        .map_err(|e| {
            warn!("QR encode failed for {}-byte payload: {}", payload.len(), e);
            ToolsError::QrEncodeFailed {
                reason: e.to_string(),
            }
        })?;

    let image = rasterise(&code, options);
    debug!(
        "QR {:?}: {} modules → {}x{} px",
        code.version(),
        code.width(),
        image.width(),
        image.height()
    );

    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ToolsError::QrEncodeFailed {
            reason: format!("PNG encoding failed: {e}"),
        })?;

    Ok(Artifact::new("image/png", buf, QR_FILENAME))
}

/// Render the fixed placeholder QR code.
///
/// The placeholder always uses level M; the configured level only applies to
/// user payloads.
pub fn sample(options: &QrOptions) -> Result<Artifact, ToolsError> {
    let options = QrOptions {
        error_correction: SAMPLE_EC_LEVEL,
        ..options.clone()
    };
    encode_qr(SAMPLE_PAYLOAD, &options)
}

fn ec_level(level: QrEcLevel) -> EcLevel {
    match level {
        QrEcLevel::Low => EcLevel::L,
        QrEcLevel::Medium => EcLevel::M,
        QrEcLevel::Quartile => EcLevel::Q,
        QrEcLevel::High => EcLevel::H,
    }
}

/// Scale factor (pixels per module) for a symbol of `modules` modules.
fn scale_for(modules: usize, options: &QrOptions) -> f64 {
    let span = (modules + 2 * options.margin as usize) as f64;
    if options.width as f64 >= span {
        options.width as f64 / span
    } else {
        FALLBACK_SCALE
    }
}

fn rasterise(code: &QrCode, options: &QrOptions) -> RgbaImage {
    let modules = code.width();
    let colors = code.to_colors();
    let scale = scale_for(modules, options);
    let span = (modules + 2 * options.margin as usize) as f64;
    let side = (span * scale).floor() as u32;
    let margin_px = options.margin as f64 * scale;
    let dark = Rgba(options.dark.0);
    let light = Rgba(options.light.0);

    RgbaImage::from_fn(side, side, |x, y| {
        let (px, py) = (x as f64, y as f64);
        let inside = px >= margin_px
            && py >= margin_px
            && px < side as f64 - margin_px
            && py < side as f64 - margin_px;
        if !inside {
            return light;
        }
        let col = (((px - margin_px) / scale).floor() as usize).min(modules - 1);
        let row = (((py - margin_px) / scale).floor() as usize).min(modules - 1);
        match colors[row * modules + col] {
            Color::Dark => dark,
            Color::Light => light,
        }
    })
}
