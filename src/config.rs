//! Configuration types for PII redaction.
//!
//! Every knob lives in [`RedactionConfig`], built through
//! [`RedactionConfigBuilder`]. Setters clamp obviously out-of-range values;
//! [`RedactionConfigBuilder::build`] rejects combinations that cannot
//! produce a trustworthy artifact (no labels enabled, a blur that blurs
//! nothing).

use crate::error::RedactError;
use crate::pipeline::rasterize::FillMode;
use crate::progress::ProgressCallback;
use crate::span::PiiLabel;
use std::fmt;

/// Default upload/file size cap: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default longest edge handed to the OCR adapter.
pub const DEFAULT_MAX_OCR_DIMENSION: u32 = 1200;

/// Default length above which a punctuated line is treated as an address.
pub const DEFAULT_ADDRESS_MIN_CHARS: usize = 25;

/// Configuration for a redaction run.
///
/// # Example
/// ```rust
/// use pii_redact::{FillMode, PiiLabel, RedactionConfig};
///
/// let config = RedactionConfig::builder()
///     .fill(FillMode::WHITE)
///     .padding(2)
///     .labels([PiiLabel::Aadhaar, PiiLabel::Phone])
///     .build()
///     .unwrap();
/// assert_eq!(config.labels.len(), 2);
/// ```
#[derive(Clone)]
pub struct RedactionConfig {
    /// How rectangles are painted. Default: opaque black.
    pub fill: FillMode,

    /// Pixels added on every side of each rectangle before clamping.
    /// Default: 0.
    pub padding: u32,

    /// A line must be longer than this many characters before punctuation
    /// alone marks it as an address. Default: 25.
    pub address_min_chars: usize,

    /// Labels whose detectors are enabled, in any order. Default: all.
    pub labels: Vec<PiiLabel>,

    /// Inputs larger than this are rejected before decoding. Default: 10 MiB.
    pub max_upload_bytes: u64,

    /// Longest edge of the raster given to OCR; larger inputs are
    /// downscaled and spans mapped back. `0` disables. Default: 1200.
    pub max_ocr_dimension: u32,

    /// Concurrent recognitions allowed by a pool built with
    /// [`crate::ocr::OcrPool::from_config`]. Default: 1.
    pub ocr_workers: usize,

    /// Inputs processed at once by the batch API. Default: 4.
    pub concurrency: usize,

    /// Optional progress callback for batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            fill: FillMode::default(),
            padding: 0,
            address_min_chars: DEFAULT_ADDRESS_MIN_CHARS,
            labels: PiiLabel::ALL.to_vec(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_ocr_dimension: DEFAULT_MAX_OCR_DIMENSION,
            ocr_workers: 1,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RedactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionConfig")
            .field("fill", &self.fill)
            .field("padding", &self.padding)
            .field("address_min_chars", &self.address_min_chars)
            .field("labels", &self.labels)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_ocr_dimension", &self.max_ocr_dimension)
            .field("ocr_workers", &self.ocr_workers)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn RedactionProgressCallback>"),
            )
            .finish()
    }
}

impl RedactionConfig {
    pub fn builder() -> RedactionConfigBuilder {
        RedactionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RedactionConfig`].
#[derive(Debug)]
pub struct RedactionConfigBuilder {
    config: RedactionConfig,
}

impl RedactionConfigBuilder {
    pub fn fill(mut self, fill: FillMode) -> Self {
        self.config.fill = fill;
        self
    }

    pub fn padding(mut self, px: u32) -> Self {
        self.config.padding = px.min(256);
        self
    }

    pub fn address_min_chars(mut self, n: usize) -> Self {
        self.config.address_min_chars = n;
        self
    }

    /// Enable exactly these labels. Duplicates are dropped.
    pub fn labels(mut self, labels: impl IntoIterator<Item = PiiLabel>) -> Self {
        let mut labels: Vec<PiiLabel> = labels.into_iter().collect();
        labels.sort();
        labels.dedup();
        self.config.labels = labels;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_ocr_dimension(mut self, px: u32) -> Self {
        self.config.max_ocr_dimension = px;
        self
    }

    pub fn ocr_workers(mut self, n: usize) -> Self {
        self.config.ocr_workers = n.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Inject a progress callback for batch runs.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RedactionConfig, RedactError> {
        let c = &self.config;
        if c.labels.is_empty() {
            return Err(RedactError::InvalidConfig(
                "At least one PII label must be enabled".into(),
            ));
        }
        if let FillMode::Blur { sigma } = c.fill {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(RedactError::InvalidConfig(format!(
                    "Blur sigma must be a positive number, got {sigma}"
                )));
            }
        }
        if c.max_upload_bytes == 0 {
            return Err(RedactError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_ocr_dimension != 0 && c.max_ocr_dimension < 32 {
            return Err(RedactError::InvalidConfig(format!(
                "max_ocr_dimension must be 0 (disabled) or ≥ 32, got {}",
                c.max_ocr_dimension
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RedactionConfig::default();
        assert_eq!(c.fill, FillMode::BLACK);
        assert_eq!(c.padding, 0);
        assert_eq!(c.address_min_chars, 25);
        assert_eq!(c.labels, PiiLabel::ALL.to_vec());
        assert_eq!(c.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(c.max_ocr_dimension, 1200);
        assert_eq!(c.ocr_workers, 1);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn setters_clamp() {
        let c = RedactionConfig::builder()
            .concurrency(0)
            .ocr_workers(0)
            .padding(10_000)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.ocr_workers, 1);
        assert_eq!(c.padding, 256);
    }

    #[test]
    fn labels_are_deduplicated() {
        let c = RedactionConfig::builder()
            .labels([PiiLabel::Phone, PiiLabel::Aadhaar, PiiLabel::Phone])
            .build()
            .unwrap();
        assert_eq!(c.labels, vec![PiiLabel::Aadhaar, PiiLabel::Phone]);
    }

    #[test]
    fn empty_label_set_is_rejected() {
        let err = RedactionConfig::builder().labels([]).build().unwrap_err();
        assert!(matches!(err, RedactError::InvalidConfig(_)));
    }

    #[test]
    fn bad_blur_sigma_is_rejected() {
        for sigma in [0.0, -1.0, f32::NAN] {
            let err = RedactionConfig::builder()
                .fill(FillMode::Blur { sigma })
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("sigma"), "{err}");
        }
        assert!(RedactionConfig::builder()
            .fill(FillMode::Blur { sigma: 8.0 })
            .build()
            .is_ok());
    }

    #[test]
    fn tiny_ocr_dimension_is_rejected_but_zero_disables() {
        assert!(RedactionConfig::builder().max_ocr_dimension(8).build().is_err());
        assert!(RedactionConfig::builder().max_ocr_dimension(0).build().is_ok());
    }

    #[test]
    fn debug_hides_callback() {
        use crate::progress::NoopProgressCallback;
        use std::sync::Arc;

        let c = RedactionConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn RedactionProgressCallback>"));
    }
}
