//! CLI binary for portfolio-devtools.
//!
//! A thin shim over the library crate: each subcommand maps its flags onto
//! `ToolsConfig`, drives one tool of a `DevTools` session and saves the
//! artifact into `--out-dir`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use portfolio_devtools::{
    DevTools, DocumentProgressCallback, HexColor, ProgressCallback, QrEcLevel, ResizeParams,
    SelectedFile, ToolTab, ToolsConfig,
};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Flag sizes saturate instead of wrapping.
fn kb_to_bytes(kb: u64) -> u64 {
    kb.saturating_mul(1024)
}

fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the selected files, with one log line per placed or
/// skipped file.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Building PDF");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }
}

impl DocumentProgressCallback for CliProgressCallback {
    fn on_assembly_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
    }

    fn on_file_read(&self, _index: usize, _total: usize, bytes: u64) {
        self.bar
            .set_message(dim(&format!("read {:.1} KB", bytes as f64 / 1024.0)));
    }

    fn on_file_placed(&self, index: usize, total: usize, name: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            name
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, index: usize, total: usize, name: &str, mime_type: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            yellow("⚠"),
            index + 1,
            total,
            name,
            dim(&format!("skipped ({mime_type})"))
        ));
        self.bar.inc(1);
    }

    fn on_assembly_complete(&self, total_files: usize, page_count: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages from {} files{}",
            if skipped == 0 { green("✔") } else { cyan("⚠") },
            bold(&page_count.to_string()),
            total_files,
            if skipped == 0 {
                String::new()
            } else {
                format!("  ({} skipped)", yellow(&skipped.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # QR code from text or a URL
  devtools qr "https://example.com"

  # QR code embedding an image (max 10 MB)
  devtools qr --image logo.png

  # Sample QR code
  devtools qr

  # Resize a photo to fit 800x600 at 80% quality
  devtools resize photo.jpg --width 800 --height 600 --quality 0.8

  # Images and text files, one page each, in the order given
  devtools pdf cover.png notes.txt diagram.jpg -o out/

  # JSON summary
  devtools --json pdf a.png b.txt

OUTPUT FILES:
  qr      qrcode.png
  resize  resized-image.jpg      (JPEG, never larger than 1 MB)
  pdf     converted-document.pdf (A4 portrait; unsupported files skipped)

ENVIRONMENT VARIABLES:
  DEVTOOLS_OUT_DIR        Output directory
  DEVTOOLS_QR_WIDTH       QR width in pixels
  DEVTOOLS_RESIZE_QUALITY JPEG quality 0.1–1.0
  RUST_LOG                Override the log filter
"#;

/// Generate QR codes, resize images and bundle images/text into a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "devtools",
    version,
    about = "Generate QR codes, resize images and bundle images/text into a PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory the artifact is written to.
    #[arg(short, long, global = true, env = "DEVTOOLS_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Print a JSON summary on stdout.
    #[arg(long, global = true, env = "DEVTOOLS_JSON")]
    json: bool,

    /// Disable progress output.
    #[arg(long, global = true, env = "DEVTOOLS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DEVTOOLS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DEVTOOLS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode text, a URL or an image as a QR code (qrcode.png).
    Qr {
        /// Text or URL to encode. Without it the sample QR code is written.
        text: Option<String>,

        /// Encode this image as a data URI instead of text.
        #[arg(long, conflicts_with = "text")]
        image: Option<PathBuf>,

        /// Output width in pixels.
        #[arg(long, env = "DEVTOOLS_QR_WIDTH", default_value_t = 256)]
        width: u32,

        /// Quiet zone in modules.
        #[arg(long, env = "DEVTOOLS_QR_MARGIN", default_value_t = 2)]
        margin: u32,

        /// Dark module colour (#RRGGBB or #RRGGBBAA).
        #[arg(long, env = "DEVTOOLS_QR_DARK", default_value = "#000000")]
        dark: String,

        /// Light module colour (#RRGGBB or #RRGGBBAA).
        #[arg(long, env = "DEVTOOLS_QR_LIGHT", default_value = "#FFFFFF")]
        light: String,

        /// Error-correction level.
        #[arg(long, env = "DEVTOOLS_QR_EC", value_enum, default_value = "low")]
        error_correction: EcArg,

        /// Largest accepted image upload, in MB.
        #[arg(long, env = "DEVTOOLS_QR_MAX_UPLOAD_MB", default_value_t = 10,
              value_parser = clap::value_parser!(u64).range(1..))]
        max_upload_mb: u64,
    },

    /// Downscale and recompress an image as JPEG (resized-image.jpg).
    Resize {
        /// Source image.
        image: PathBuf,

        /// Target width in pixels.
        #[arg(long, env = "DEVTOOLS_RESIZE_WIDTH", default_value_t = 800)]
        width: u32,

        /// Target height in pixels.
        #[arg(long, env = "DEVTOOLS_RESIZE_HEIGHT", default_value_t = 600)]
        height: u32,

        /// JPEG quality, 0.1–1.0.
        #[arg(long, env = "DEVTOOLS_RESIZE_QUALITY", default_value_t = 0.8)]
        quality: f32,

        /// Output size ceiling in KB.
        #[arg(long, env = "DEVTOOLS_RESIZE_MAX_KB", default_value_t = 1024,
              value_parser = clap::value_parser!(u64).range(1..))]
        max_kb: u64,
    },

    /// Place images and .txt files on PDF pages, in order (converted-document.pdf).
    Pdf {
        /// Files to include; unsupported types are skipped.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Files read ahead concurrently.
        #[arg(long, env = "DEVTOOLS_PDF_READ_CONCURRENCY", default_value_t = 4)]
        read_concurrency: usize,

        /// Font size for text pages, in points.
        #[arg(long, env = "DEVTOOLS_PDF_FONT_SIZE", default_value_t = 16.0)]
        font_size: f32,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EcArg {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<EcArg> for QrEcLevel {
    fn from(v: EcArg) -> Self {
        match v {
            EcArg::Low => QrEcLevel::Low,
            EcArg::Medium => QrEcLevel::Medium,
            EcArg::Quartile => QrEcLevel::Quartile,
            EcArg::High => QrEcLevel::High,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports per-file outcomes, so INFO logs are
    // muted while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Qr {
            text,
            image,
            width,
            margin,
            dark,
            light,
            error_correction,
            max_upload_mb,
        } => {
            let dark = HexColor::parse(dark).context("Invalid --dark colour")?;
            let light = HexColor::parse(light).context("Invalid --light colour")?;
            let config = ToolsConfig::builder()
                .qr_width(*width)
                .qr_margin(*margin)
                .qr_colors(dark, light)
                .qr_error_correction((*error_correction).into())
                .max_qr_upload_bytes(mb_to_bytes(*max_upload_mb))
                .build()
                .context("Invalid configuration")?;
            run_qr(&cli, config, text.as_deref(), image.as_deref()).await
        }
        Command::Resize {
            image,
            width,
            height,
            quality,
            max_kb,
        } => {
            let config = ToolsConfig::builder()
                .max_output_bytes(kb_to_bytes(*max_kb))
                .build()
                .context("Invalid configuration")?;
            let params = ResizeParams::new(*width, *height, *quality);
            run_resize(&cli, config, image, params, show_progress).await
        }
        Command::Pdf {
            files,
            read_concurrency,
            font_size,
        } => {
            let mut builder = ToolsConfig::builder()
                .read_concurrency(*read_concurrency)
                .font_size_pt(*font_size);
            if show_progress {
                let cb = CliProgressCallback::new();
                builder = builder.progress_callback(cb as ProgressCallback);
            }
            let config = builder.build().context("Invalid configuration")?;
            run_pdf(&cli, config, files, show_progress).await
        }
    }
}

async fn run_qr(
    cli: &Cli,
    config: ToolsConfig,
    text: Option<&str>,
    image: Option<&Path>,
) -> Result<()> {
    let mut tools = DevTools::new(config);

    if let Some(path) = image {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tools
            .upload_qr_image(&file)
            .await
            .context("Image upload rejected")?;
        tools.generate_qr().context("QR generation failed")?;
    } else if let Some(text) = text {
        tools.set_qr_text(text)?;
        tools.generate_qr().context("QR generation failed")?;
    }

    let saved = tools
        .qr()
        .download(&cli.out_dir)
        .await
        .context("Failed to save QR code")?;

    if cli.json {
        let summary = json!({
            "tool": ToolTab::Qr.key(),
            "input": tools.qr().input().kind(),
            "artifact": tools.qr().displayed(),
            "path": saved,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!("{}  QR code  →  {}", green("✔"), bold(&saved.display().to_string()));
    }
    Ok(())
}

async fn run_resize(
    cli: &Cli,
    config: ToolsConfig,
    image: &Path,
    params: ResizeParams,
    show_progress: bool,
) -> Result<()> {
    let mut tools = DevTools::new(config);
    tools.select_tab(ToolTab::Resize);

    let file = SelectedFile::from_path(image)
        .await
        .with_context(|| format!("Failed to open {}", image.display()))?;
    tools.load_resize_source(file).await.context("Failed to load image")?;
    tools.set_resize_params(params)?;

    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Resizing");
        bar.set_message(format!(
            "≤ {}px, quality {}%",
            params.max_dimension(),
            params.quality_percent()
        ));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let outcome = tools.resize().await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = outcome.context("Resize failed")?;

    let saved = tools
        .resizer()
        .download(&cli.out_dir)
        .await
        .context("Failed to save resized image")?;

    let report = output.report;
    if cli.json {
        let summary = json!({
            "tool": ToolTab::Resize.key(),
            "params": params,
            "output": output,
            "reduction_percent": report.reduction_percent(),
            "path": saved,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {}x{}  →  {}",
            green("✔"),
            output.width,
            output.height,
            bold(&saved.display().to_string())
        );
        eprintln!(
            "   Original: {}  /  Resized: {}  /  Reduction: {}",
            dim(&format!("{:.1} KB", report.original_bytes as f64 / 1024.0)),
            dim(&format!("{:.1} KB", report.resized_bytes as f64 / 1024.0)),
            report.format_reduction().unwrap_or_else(|| "n/a".into()),
        );
    }
    Ok(())
}

async fn run_pdf(
    cli: &Cli,
    config: ToolsConfig,
    paths: &[PathBuf],
    show_progress: bool,
) -> Result<()> {
    let mut tools = DevTools::new(config);
    tools.select_tab(ToolTab::Document);

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        files.push(file);
    }
    tools.select_documents(files)?;

    if !cli.quiet && !cli.json {
        eprintln!("{} {}", cyan("◆"), bold("Selected files:"));
        for label in tools.documents().labels() {
            eprintln!("  {}", label);
        }
    }

    let output = tools
        .convert_documents()
        .await
        .context("PDF conversion failed")?;
    let saved = tools
        .documents()
        .download(&cli.out_dir)
        .await
        .context("Failed to save PDF")?;

    if cli.json {
        let summary = json!({
            "tool": ToolTab::Document.key(),
            "output": output,
            "path": saved,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        // The progress callback already listed skipped files.
        if !show_progress {
            for notice in &output.skipped {
                eprintln!("  {} {}", yellow("⚠"), notice);
            }
        }
        eprintln!(
            "{}  {} pages  →  {}",
            green("✔"),
            output.page_count,
            bold(&saved.display().to_string())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_flags_saturate() {
        assert_eq!(kb_to_bytes(1024), 1_048_576);
        assert_eq!(mb_to_bytes(10), 10_485_760);
        assert_eq!(kb_to_bytes(u64::MAX), u64::MAX);
        assert_eq!(mb_to_bytes(u64::MAX / 1024), u64::MAX);
    }
}
