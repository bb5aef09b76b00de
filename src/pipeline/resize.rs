//! Image resize pipeline: downscale + JPEG recompression under a byte ceiling.
//!
//! ## Why spawn_blocking?
//!
//! Decoding a 12-megapixel photo, resampling it and re-encoding it as JPEG is
//! pure CPU work that can take hundreds of milliseconds. Running it on a Tokio
//! worker would stall every other task, so [`resize_image`] moves the work onto
//! the blocking pool and only awaits its completion.
//!
//! ## The shrink loop
//!
//! The user's width and height collapse into a single longest-edge bound
//! (`max(width, height)`), so aspect ratio is always preserved and images are
//! never upscaled. The user's quality is the starting point; if the encoded
//! JPEG is still above the ceiling (1 MB by default), quality and both
//! dimensions drop by 5 % per round, and after `max_iterations` rounds the
//! dimensions drop by 25 % per round until the output fits.

use crate::artifact::{Artifact, RESIZED_FILENAME};
use crate::config::ResizeOptions;
use crate::error::ToolsError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const GENTLE_STEP: f32 = 0.95;
const COARSE_STEP: f32 = 0.75;

/// User-facing resize settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeParams {
    /// Target width in pixels. Default: 800.
    pub width: u32,
    /// Target height in pixels. Default: 600.
    pub height: u32,
    /// JPEG quality in `[0.1, 1.0]`. Default: 0.8.
    pub quality: f32,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            quality: 0.8,
        }
    }
}

impl ResizeParams {
    /// Build params, clamping quality to `[0.1, 1.0]` and dimensions to ≥ 1.
    pub fn new(width: u32, height: u32, quality: f32) -> Self {
        let quality = if quality.is_finite() {
            quality.clamp(0.1, 1.0)
        } else {
            0.8
        };
        Self {
            width: width.max(1),
            height: height.max(1),
            quality,
        }
    }

    /// The single longest-edge bound handed to the transform.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Quality as a whole percentage, as shown next to the slider.
    pub fn quality_percent(&self) -> u32 {
        (self.quality * 100.0).round() as u32
    }
}

/// Original vs. resized byte sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub resized_bytes: u64,
}

impl SizeReport {
    /// `(original − resized) / original × 100`. Negative when the output grew.
    /// `None` for an empty original.
    pub fn reduction_percent(&self) -> Option<f64> {
        if self.original_bytes == 0 {
            return None;
        }
        let original = self.original_bytes as f64;
        Some((original - self.resized_bytes as f64) / original * 100.0)
    }

    /// Reduction with one decimal place, e.g. `"42.5%"`.
    pub fn format_reduction(&self) -> Option<String> {
        self.reduction_percent().map(|p| format!("{p:.1}%"))
    }
}

/// Result of a successful resize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeOutput {
    pub artifact: Artifact,
    pub width: u32,
    pub height: u32,
    /// Quality the final encode used; lower than requested if the ceiling
    /// forced extra rounds.
    pub quality_used: f32,
    pub report: SizeReport,
}

impl ResizeOutput {
    pub fn preview_data_uri(&self) -> String {
        self.artifact.to_data_uri()
    }
}

/// Resize and recompress `bytes` off the async executor.
pub async fn resize_image(
    name: &str,
    bytes: Vec<u8>,
    params: ResizeParams,
    options: &ResizeOptions,
) -> Result<ResizeOutput, ToolsError> {
    let name = name.to_string();
    let options = options.clone();

    tokio::task::spawn_blocking(move || resize_blocking(&name, &bytes, params, &options))
        .await
        .map_err(|e| ToolsError::Internal(format!("Resize task panicked: {}", e)))?
}

/// Blocking implementation of the resize transform.
pub fn resize_blocking(
    name: &str,
    bytes: &[u8],
    params: ResizeParams,
    options: &ResizeOptions,
) -> Result<ResizeOutput, ToolsError> {
    let source = image::load_from_memory(bytes).map_err(|e| {
        error!("Error resizing image '{}': {}", name, e);
        ToolsError::ImageDecodeFailed {
            name: name.to_string(),
            detail: e.to_string(),
        }
    })?;
    let (src_w, src_h) = source.dimensions();
    let (mut w, mut h) = fit_within(src_w, src_h, params.max_dimension());
    let mut quality = params.quality;
    let max_bytes = options.max_output_bytes;

    let mut round = 0u32;
    loop {
        let frame = if (w, h) == (src_w, src_h) {
            source.clone()
        } else {
            source.resize_exact(w, h, FilterType::Lanczos3)
        };
        let encoded = encode_jpeg(&frame, quality)?;
        debug!(
            "Resize round {}: {}x{} q={:.2} → {} bytes",
            round,
            w,
            h,
            quality,
            encoded.len()
        );

        if encoded.len() as u64 <= max_bytes {
            let report = SizeReport {
                original_bytes: bytes.len() as u64,
                resized_bytes: encoded.len() as u64,
            };
            info!(
                "Resized '{}' {}x{} → {}x{} ({} → {} bytes)",
                name,
                src_w,
                src_h,
                w,
                h,
                report.original_bytes,
                report.resized_bytes
            );
            return Ok(ResizeOutput {
                artifact: Artifact::new("image/jpeg", encoded, RESIZED_FILENAME),
                width: w,
                height: h,
                quality_used: quality,
                report,
            });
        }

        if w == 1 && h == 1 {
            return Err(ToolsError::ResizeFailed {
                detail: format!("cannot fit '{name}' under {max_bytes} bytes"),
            });
        }

        if round < options.max_iterations {
            quality = (quality * GENTLE_STEP).max(0.01);
            w = shrink(w, GENTLE_STEP);
            h = shrink(h, GENTLE_STEP);
        } else {
            w = shrink(w, COARSE_STEP);
            h = shrink(h, COARSE_STEP);
        }
        round += 1;
    }
}

/// Scale `(w, h)` so the longest edge is at most `max_dim`; never upscale.
pub fn fit_within(w: u32, h: u32, max_dim: u32) -> (u32, u32) {
    let longest = w.max(h);
    if longest <= max_dim || longest == 0 {
        return (w, h);
    }
    let scale = max_dim as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    (nw, nh)
}

fn shrink(v: u32, factor: f32) -> u32 {
    ((v as f32 * factor).floor() as u32).max(1)
}

/// Composite any alpha channel over white. JPEG has no alpha, and
/// transparent pixels would otherwise keep their stored colour (usually black).
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, ToolsError> {
    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let rgb = DynamicImage::ImageRgb8(flatten_onto_white(img));
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q))
        .map_err(|e| ToolsError::ResizeFailed {
            detail: format!("JPEG encoding failed: {e}"),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn noise(w: u32, h: u32) -> RgbImage {
        let mut state: u32 = 0x1234_5678;
        RgbImage::from_fn(w, h, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let [a, b, c, _] = state.to_le_bytes();
            Rgb([a, b, c])
        })
    }

    #[test]
    fn params_clamp_quality() {
        assert_eq!(ResizeParams::new(10, 10, 0.0).quality, 0.1);
        assert_eq!(ResizeParams::new(10, 10, 5.0).quality, 1.0);
        assert_eq!(ResizeParams::new(0, 10, f32::NAN).width, 1);
        assert_eq!(ResizeParams::new(800, 1200, 0.8).max_dimension(), 1200);
        assert_eq!(ResizeParams::default().quality_percent(), 80);
    }

    #[test]
    fn fit_within_preserves_aspect() {
        assert_eq!(fit_within(4000, 2000, 800), (800, 400));
        assert_eq!(fit_within(1000, 3000, 600), (200, 600));
        assert_eq!(fit_within(300, 200, 800), (300, 200));
    }

    #[test]
    fn reduction_percent_formula() {
        let r = SizeReport {
            original_bytes: 2000,
            resized_bytes: 500,
        };
        assert_eq!(r.reduction_percent(), Some(75.0));
        assert_eq!(r.format_reduction().as_deref(), Some("75.0%"));

        let grew = SizeReport {
            original_bytes: 1000,
            resized_bytes: 1234,
        };
        assert_eq!(grew.format_reduction().as_deref(), Some("-23.4%"));

        let empty = SizeReport {
            original_bytes: 0,
            resized_bytes: 10,
        };
        assert_eq!(empty.reduction_percent(), None);
    }

    #[test]
    fn downscales_to_longest_edge() {
        let bytes = png_bytes(RgbImage::from_pixel(400, 200, Rgb([10, 200, 30])));
        let out = resize_blocking(
            "wide.png",
            &bytes,
            ResizeParams::new(100, 50, 0.8),
            &ResizeOptions::default(),
        )
        .unwrap();
        assert_eq!((out.width, out.height), (100, 50));
        assert_eq!(out.artifact.mime_type, "image/jpeg");
        assert_eq!(out.artifact.suggested_filename, "resized-image.jpg");
        let decoded = image::load_from_memory(&out.artifact.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn ceiling_forces_extra_rounds() {
        let bytes = png_bytes(noise(300, 300));
        let options = ResizeOptions {
            max_output_bytes: 20_000,
            ..ResizeOptions::default()
        };
        let out = resize_blocking("noise.png", &bytes, ResizeParams::new(800, 600, 1.0), &options)
            .unwrap();
        assert!(out.report.resized_bytes <= 20_000);
        assert!(out.width < 300);
        assert!(out.quality_used < 1.0);
    }

    #[test]
    fn higher_quality_is_never_smaller() {
        let bytes = png_bytes(noise(160, 120));
        let opts = ResizeOptions::default();
        let mut previous = 0;
        for q in [0.2, 0.5, 0.8, 1.0] {
            let out = resize_blocking("n.png", &bytes, ResizeParams::new(800, 600, q), &opts).unwrap();
            assert!(out.report.resized_bytes >= previous, "q={q}");
            assert!(out.report.resized_bytes <= opts.max_output_bytes);
            previous = out.report.resized_bytes;
        }
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let err = resize_blocking(
            "fake.jpg",
            b"not an image",
            ResizeParams::default(),
            &ResizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ToolsError::ImageDecodeFailed { .. }));
    }

    #[tokio::test]
    async fn resize_image_runs_off_thread() {
        let bytes = png_bytes(RgbImage::from_pixel(64, 64, Rgb([0, 0, 255])));
        let out = resize_image("blue.png", bytes.clone(), ResizeParams::new(32, 32, 0.5), &ResizeOptions::default())
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (32, 32));
        assert_eq!(out.report.original_bytes, bytes.len() as u64);
        assert!(out.preview_data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn alpha_is_flattened_onto_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([0, 0, 0, 128])
            }
        }));
        let flat = flatten_onto_white(&img);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn transparent_png_resizes_to_white() {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let out = resize_blocking("clear.png", &bytes, ResizeParams::default(), &ResizeOptions::default())
            .unwrap();
        let decoded = image::load_from_memory(&out.artifact.bytes).unwrap().to_rgb8();
        assert!(decoded.pixels().all(|p| p.0.iter().all(|c| *c >= 250)));
    }
}
