//! Error types for the pii-redact library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RedactError`]: **Fatal**: the request cannot produce a trustworthy
//!   artifact (unreadable raster, output cannot be written, the OCR engine
//!   failed). Returned as `Err(RedactError)` from the top-level `redact*`
//!   functions.
//!
//! * [`GeometryFault`]: **Non-fatal**: a single span carried a boundary the
//!   reconciler cannot turn into a rectangle (wrong point count, NaN
//!   coordinates). The span is skipped and counted in
//!   [`crate::output::RedactionStats::spans_skipped`]; the rest of the
//!   document is still redacted.
//!
//! "Nothing to redact" is neither: it is
//! [`crate::output::RedactionOutcome::NoPiiFound`], a successful outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by an [`crate::ocr::OcrAdapter`].
///
/// Kept opaque so any recognition backend can report its own error type;
/// it is carried unchanged inside [`RedactError::UpstreamRecognition`].
pub type OcrError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All fatal errors returned by the pii-redact library.
///
/// Per-span geometry problems use [`GeometryFault`] and never surface here.
#[derive(Debug, Error)]
pub enum RedactError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Input was read but cannot be accepted (wrong content type, unknown
    /// image signature, malformed span document, …).
    #[error("Malformed input '{input}': {reason}")]
    MalformedInput { input: String, reason: String },

    /// Upload or file exceeds the configured size limit.
    #[error("Input '{input}' is {size} bytes; the limit is {limit} bytes")]
    InputTooLarge { input: String, size: u64, limit: u64 },

    // ── Raster errors ─────────────────────────────────────────────────────
    /// The bytes could not be interpreted as a raster image.
    #[error("Failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The redacted raster could not be serialised.
    #[error("Failed to encode redacted image '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    // ── Recognition errors ────────────────────────────────────────────────
    /// The OCR adapter itself failed. Recognition is never retried here.
    #[error("Text recognition failed for '{path}': {source}")]
    UpstreamRecognition {
        path: PathBuf,
        #[source]
        source: OcrError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the redacted output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task join failure, temp file creation).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a span's boundary could not be reconciled into a rectangle.
///
/// Recovered locally: the reconciler logs the fault, skips the span, and
/// carries on with the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum GeometryFault {
    /// The boundary did not have exactly four points.
    #[error("boundary has {0} points, expected 4")]
    WrongPointCount(usize),

    /// At least one coordinate was NaN, infinite, or non-numeric in the source.
    #[error("boundary has a non-numeric coordinate")]
    NonFiniteCoordinate,

    /// The target raster has zero width or height.
    #[error("target image is empty")]
    EmptyImage,
}
