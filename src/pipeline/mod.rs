//! Pipeline stages for identity-document redaction.
//!
//! Each submodule implements exactly one transformation step and is
//! testable on its own. The OCR call itself sits between `preprocess` and
//! `classify` and lives in [`crate::ocr`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode::decode ──▶ preprocess ──▶ [OCR] ──▶ classify ──▶ reconcile ──▶ rasterize ──▶ encode::encode
//! (path/upload)  (raster)      (downscale)    (spans)   (PiiMatch)  (rectangles)   (painted)     (same format)
//! ```
//!
//! 1. [`input`]     : validate path or upload (size, signature); spill
//!    uploads to a self-deleting temp file
//! 2. [`encode`]    : bytes to `DynamicImage` and back, keeping the format
//! 3. [`preprocess`]: shrink the OCR copy and map spans back afterwards
//! 4. [`classify`]  : ordered detector battery, first hit wins per span
//! 5. [`reconcile`] : quadrilateral to clamped inclusive rectangle;
//!    malformed geometry is skipped per span
//! 6. [`rasterize`] : paint rectangles onto a copy (solid or blur)

pub mod classify;
pub mod encode;
pub mod input;
pub mod preprocess;
pub mod rasterize;
pub mod reconcile;
