//! Progress-callback trait for batch redaction events.
//!
//! Inject an [`Arc<dyn RedactionProgressCallback>`] via
//! [`crate::config::RedactionConfigBuilder::progress_callback`] to receive
//! events as [`crate::stream::redact_batch`] works through its inputs.
//! Callers can forward them to a channel, a log, or a terminal progress bar
//! without the library knowing how the host application communicates.
//!
//! Events carry counts and identifiers only, never recognised text.
//!
//! # Example
//!
//! ```rust
//! use pii_redact::{RedactionConfig, RedactionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl RedactionProgressCallback for Counter {
//!     fn on_input_complete(&self, index: usize, total: usize, rects_applied: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} done, {} regions", index + 1, total, rects_applied);
//!     }
//! }
//!
//! let config = RedactionConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch pipeline as it processes each input.
///
/// Inputs run concurrently, so `on_input_*` may be called from several
/// tasks at once; protect shared state with atomics or a `Mutex`. All
/// methods default to no-ops.
pub trait RedactionProgressCallback: Send + Sync {
    /// Called once before any input is opened.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when work on an input begins.
    ///
    /// # Arguments
    /// * `index`: 0-based position of the input in the batch
    /// * `total`: batch size
    fn on_input_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an input finishes without a fatal error.
    ///
    /// `rects_applied` is 0 when no PII was found.
    fn on_input_complete(&self, index: usize, total: usize, rects_applied: usize) {
        let _ = (index, total, rects_applied);
    }

    /// Called when an input fails; the rest of the batch continues.
    fn on_input_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every input has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl RedactionProgressCallback for NoopProgressCallback {}

/// The callback type stored in [`crate::config::RedactionConfig`].
pub type ProgressCallback = Arc<dyn RedactionProgressCallback>;
