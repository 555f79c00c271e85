//! Progress-callback trait for per-image extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch processes each photo ("3 of 12: processing
//! gondola_03.jpg"). The CLI forwards them to a terminal progress bar; a web
//! front-end could forward them to a WebSocket instead.
//!
//! # Example
//!
//! ```rust
//! use shelf_tag_reader::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, image_name: &str) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{n} de {total}: {image_name} (#{index})");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .api_key("gsk_test")
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each image.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-image methods are called from several tasks at once. All methods have
/// no-op defaults so callers only override what they care about.
///
/// `index` is always the 1-based position of the image in the input batch.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first image is encoded.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before an image is sent to the vision model.
    fn on_image_start(&self, index: usize, total: usize, image_name: &str) {
        let _ = (index, total, image_name);
    }

    /// Called when an image produced a priced record.
    fn on_image_complete(&self, index: usize, total: usize, image_name: &str) {
        let _ = (index, total, image_name);
    }

    /// Called when an image failed; `error` is human-readable.
    fn on_image_error(&self, index: usize, total: usize, image_name: &str, error: &str) {
        let _ = (index, total, image_name, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
