//! # pii-redact
//!
//! Redact personally identifiable information from photographed or scanned
//! Indian identity documents (Aadhaar, PAN, voter ID, driving licence).
//!
//! Given the text an OCR engine recognised on an image, the crate decides
//! which fragments carry PII (Aadhaar number, phone, date of birth, email,
//! name, address), turns their rotated, noisy boundaries into safe in-bounds
//! rectangles, and paints those onto a copy of the image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input      validate path / upload (size, signature)
//!  ├─ 2. Decode     bytes → raster, remembering the format
//!  ├─ 3. OCR        caller-supplied adapter behind a permit-limited pool
//!  ├─ 4. Classify   ordered rule battery, first hit wins per span
//!  ├─ 5. Reconcile  quadrilateral → clamped rectangle (bad spans skipped)
//!  ├─ 6. Rasterize  solid fill (or opt-in blur) on a copy
//!  └─ 7. Output     same format as the input, written atomically
//! ```
//!
//! No OCR engine is bundled: implement [`OcrAdapter`] for yours, or use
//! [`SidecarOcr`] to read spans an external recogniser saved as JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pii_redact::{redact_to_file, OcrPool, RedactionConfig, SidecarOcr, SpanSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ocr = OcrPool::single(SidecarOcr::new(SpanSource::Adjacent));
//!     let config = RedactionConfig::default();
//!     let report = redact_to_file("card.jpg", "card_masked.jpg", &ocr, &config).await?;
//!     eprintln!("{}: {} regions", report.message(), report.stats.rects_applied);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `piiredact` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pii-redact = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod keywords;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod redact;
pub mod span;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RedactionConfig, RedactionConfigBuilder};
pub use error::{GeometryFault, OcrError, RedactError};
pub use ocr::{OcrAdapter, OcrPool, SidecarOcr, SpanSource, StaticOcr};
pub use output::{
    DetectedRegion, OutcomeKind, OutputTarget, RedactionOutcome, RedactionOutput,
    RedactionReport, RedactionResult, RedactionStats,
};
pub use pipeline::classify::{classify, Classifier};
pub use pipeline::rasterize::{rasterize, FillMode};
pub use pipeline::reconcile::{reconcile, reconcile_boundary, RedactionRect};
pub use progress::{NoopProgressCallback, ProgressCallback, RedactionProgressCallback};
pub use redact::{
    detect, encode_output, redact, redact_bytes, redact_image, redact_into, redact_sync,
    redact_to_file,
};
pub use span::{parse_spans, PiiLabel, PiiMatch, Point, TextSpan};
pub use stream::{redact_batch, redact_stream, BatchItem, BatchStream};
