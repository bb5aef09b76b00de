//! Progress-callback trait for document assembly events.
//!
//! Inject an [`Arc<dyn DocumentProgressCallback>`] via
//! [`crate::config::ToolsConfigBuilder::progress_callback`] to receive events
//! as each selected file is read and placed into the PDF.
//!
//! Placement is strictly sequential, so `on_file_placed` and `on_file_skipped`
//! arrive in selection order. `on_file_read` may arrive out of order because
//! reads run ahead concurrently.
//!
//! # Example
//!
//! ```rust
//! use portfolio_devtools::{DocumentProgressCallback, ToolsConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     placed: AtomicUsize,
//! }
//!
//! impl DocumentProgressCallback for CountingCallback {
//!     fn on_file_placed(&self, index: usize, total: usize, name: &str) {
//!         self.placed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index + 1, total, name);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { placed: AtomicUsize::new(0) });
//!
//! let config = ToolsConfig::builder()
//!     .progress_callback(counter as Arc<dyn DocumentProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the document assembly pipeline as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 0-based positions in the selection.
pub trait DocumentProgressCallback: Send + Sync {
    /// Called once before any file is read.
    fn on_assembly_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file's bytes have been read.
    fn on_file_read(&self, index: usize, total: usize, bytes: u64) {
        let _ = (index, total, bytes);
    }

    /// Called after a file's page has been placed in the document.
    fn on_file_placed(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file is left out because of its MIME type.
    fn on_file_skipped(&self, index: usize, total: usize, name: &str, mime_type: &str) {
        let _ = (index, total, name, mime_type);
    }

    /// Called once after the PDF has been serialised.
    ///
    /// # Arguments
    /// * `total_files` — files in the selection
    /// * `page_count`  — pages in the produced document
    fn on_assembly_complete(&self, total_files: usize, page_count: usize) {
        let _ = (total_files, page_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DocumentProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ToolsConfig`].
pub type ProgressCallback = Arc<dyn DocumentProgressCallback>;
