//! Configuration types for the developer tools.
//!
//! All pipeline behaviour is controlled through [`ToolsConfig`], built via its
//! [`ToolsConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! hand the same settings to the library, the CLI and the tests, and to log
//! exactly which parameters produced an artifact.
//!
//! The defaults reproduce the Tools page: a 256 px QR code with a 2-module
//! margin at error-correction level L, a 1 MB ceiling on resized images, and
//! A4 pages with 10 mm margins for document assembly.

use crate::error::ToolsError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size limit applied to QR image uploads before they are read. 10 MB.
pub const DEFAULT_MAX_QR_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Output ceiling for the resize pipeline. 1 MB.
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Configuration shared by the three pipelines.
///
/// Built via [`ToolsConfig::builder()`] or using [`ToolsConfig::default()`].
///
/// # Example
/// ```rust
/// use portfolio_devtools::ToolsConfig;
///
/// let config = ToolsConfig::builder()
///     .qr_width(512)
///     .read_concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.qr.width, 512);
/// ```
#[derive(Clone)]
pub struct ToolsConfig {
    /// QR rasterisation parameters. Fixed on the Tools page; exposed here so
    /// library callers can render other sizes.
    pub qr: QrOptions,

    /// Resize ceiling and shrink-loop limits.
    pub resize: ResizeOptions,

    /// Page geometry and typography for document assembly.
    pub document: DocumentOptions,

    /// Largest accepted QR image upload in bytes. Default: 10 MB.
    ///
    /// Checked against the file's metadata before any byte is read, so a
    /// 2 GB file is rejected instantly.
    pub max_qr_upload_bytes: u64,

    /// Optional per-file progress events for document assembly.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            qr: QrOptions::default(),
            resize: ResizeOptions::default(),
            document: DocumentOptions::default(),
            max_qr_upload_bytes: DEFAULT_MAX_QR_UPLOAD_BYTES,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("qr", &self.qr)
            .field("resize", &self.resize)
            .field("document", &self.document)
            .field("max_qr_upload_bytes", &self.max_qr_upload_bytes)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn DocumentProgressCallback>"),
            )
            .finish()
    }
}

impl ToolsConfig {
    /// Create a new builder for `ToolsConfig`.
    pub fn builder() -> ToolsConfigBuilder {
        ToolsConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ToolsConfig`].
#[derive(Debug)]
pub struct ToolsConfigBuilder {
    config: ToolsConfig,
}

impl ToolsConfigBuilder {
    pub fn qr_width(mut self, px: u32) -> Self {
        self.config.qr.width = px;
        self
    }

    pub fn qr_margin(mut self, modules: u32) -> Self {
        self.config.qr.margin = modules;
        self
    }

    pub fn qr_colors(mut self, dark: HexColor, light: HexColor) -> Self {
        self.config.qr.dark = dark;
        self.config.qr.light = light;
        self
    }

    pub fn qr_error_correction(mut self, level: QrEcLevel) -> Self {
        self.config.qr.error_correction = level;
        self
    }

    pub fn max_qr_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_qr_upload_bytes = bytes;
        self
    }

    pub fn max_output_bytes(mut self, bytes: u64) -> Self {
        self.config.resize.max_output_bytes = bytes;
        self
    }

    pub fn max_resize_iterations(mut self, n: u32) -> Self {
        self.config.resize.max_iterations = n;
        self
    }

    pub fn read_concurrency(mut self, n: usize) -> Self {
        self.config.document.read_concurrency = n.max(1);
        self
    }

    pub fn font_size_pt(mut self, pt: f32) -> Self {
        self.config.document.font_size_pt = pt.clamp(4.0, 96.0);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolsConfig, ToolsError> {
        let c = &self.config;
        if c.qr.width == 0 {
            return Err(ToolsError::InvalidConfig(
                "QR width must be ≥ 1 px".into(),
            ));
        }
        if c.max_qr_upload_bytes == 0 {
            return Err(ToolsError::InvalidConfig(
                "QR upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.resize.max_output_bytes == 0 {
            return Err(ToolsError::InvalidConfig(
                "Resize output ceiling must be ≥ 1 byte".into(),
            ));
        }
        let d = &c.document;
        if d.margin_mm + d.image_width_mm > d.page_width_mm {
            return Err(ToolsError::InvalidConfig(format!(
                "Image width {}mm plus margin {}mm exceeds page width {}mm",
                d.image_width_mm, d.margin_mm, d.page_width_mm
            )));
        }
        Ok(self.config)
    }
}

// ── Section types ────────────────────────────────────────────────────────

/// Parameters for QR rasterisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrOptions {
    /// Requested image side in pixels. Default: 256.
    pub width: u32,
    /// Quiet zone in modules. Default: 2.
    pub margin: u32,
    /// Module colour. Default: `#000000`.
    pub dark: HexColor,
    /// Background colour. Default: `#FFFFFF`.
    pub light: HexColor,
    /// Default: [`QrEcLevel::Low`], which maximises payload capacity at the
    /// cost of scan robustness.
    pub error_correction: QrEcLevel,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            width: 256,
            margin: 2,
            dark: HexColor::BLACK,
            light: HexColor::WHITE,
            error_correction: QrEcLevel::default(),
        }
    }
}

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrEcLevel {
    /// ~7 % recovery. (default)
    #[default]
    Low,
    /// ~15 % recovery.
    Medium,
    /// ~25 % recovery.
    Quartile,
    /// ~30 % recovery.
    High,
}

/// Limits for the resize pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeOptions {
    /// Encoded output must not exceed this many bytes. Default: 1 MB.
    pub max_output_bytes: u64,
    /// Rounds of gentle (×0.95) quality and dimension reduction before the
    /// loop switches to coarse (×0.75) dimension steps. Default: 10.
    pub max_iterations: u32,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_iterations: 10,
        }
    }
}

/// Page layout for document assembly. Lengths are millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOptions {
    /// Default: 210 (A4).
    pub page_width_mm: f32,
    /// Default: 297 (A4).
    pub page_height_mm: f32,
    /// Distance of the placement point from the top-left corner. Default: 10.
    pub margin_mm: f32,
    /// Width of embedded images; height follows the aspect ratio. Default: 190.
    pub image_width_mm: f32,
    /// Helvetica size for text pages. Default: 16.
    pub font_size_pt: f32,
    /// Line advance as a multiple of the font size. Default: 1.15.
    pub line_height_factor: f32,
    /// JPEG quality used when re-encoding images for embedding. Default: 92.
    pub embed_jpeg_quality: u8,
    /// Files read ahead concurrently. Placement is always in selection order.
    /// Default: 4.
    pub read_concurrency: usize,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
            image_width_mm: 190.0,
            font_size_pt: 16.0,
            line_height_factor: 1.15,
            embed_jpeg_quality: 92,
            read_concurrency: 4,
        }
    }
}

// ── Colours ──────────────────────────────────────────────────────────────

/// An opaque or translucent RGBA colour written as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 4]);

impl HexColor {
    pub const BLACK: HexColor = HexColor([0, 0, 0, 255]);
    pub const WHITE: HexColor = HexColor([255, 255, 255, 255]);

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn parse(s: &str) -> Result<Self, ToolsError> {
        let hex = s.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ToolsError::InvalidConfig(format!(
                "Colour must be #RRGGBB or #RRGGBBAA, got '{s}'"
            )));
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        let alpha = if hex.len() == 8 { channel(6) } else { 255 };
        Ok(HexColor([channel(0), channel(2), channel(4), alpha]))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ToolsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        HexColor::parse(&s)
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.to_string()
    }
}
