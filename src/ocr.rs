//! OCR adapter seam and the pool that serialises access to it.
//!
//! Recognition engines are heavy, process-wide and usually not reentrant.
//! The crate never embeds one; callers implement [`OcrAdapter`] and hand it
//! to an [`OcrPool`], which caps how many recognitions run at once and
//! moves each onto tokio's blocking thread pool.
//!
//! Two adapters ship with the crate:
//!
//! * [`SidecarOcr`] reads spans an external recogniser already produced
//!   (EasyOCR-style JSON, see [`crate::span::parse_spans`]).
//! * [`StaticOcr`] returns a fixed span list, for callers that already hold
//!   OCR output in memory.

use crate::config::RedactionConfig;
use crate::error::{OcrError, RedactError};
use crate::span::{parse_spans, TextSpan};
use image::DynamicImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// A text recogniser.
///
/// `recognize` is called from a blocking thread and may take as long as it
/// needs. Returned spans must be in the pixel space of `image`.
pub trait OcrAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn recognize(&self, image: &DynamicImage, source: &Path) -> Result<Vec<TextSpan>, OcrError>;

    /// Whether the adapter may be handed a downscaled copy of the input.
    ///
    /// Adapters whose spans are fixed in advance (sidecar files, static
    /// lists) describe the original raster and must return `false`.
    fn accepts_downscaled(&self) -> bool {
        true
    }
}

/// Shared, permit-limited handle to one [`OcrAdapter`].
///
/// Cloning is cheap; every clone shares the same adapter and permits.
#[derive(Clone)]
pub struct OcrPool {
    adapter: Arc<dyn OcrAdapter>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl fmt::Debug for OcrPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrPool")
            .field("adapter", &self.adapter.name())
            .field("workers", &self.workers)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

impl OcrPool {
    /// Wrap `adapter`, allowing `workers` concurrent recognitions (min 1).
    pub fn new(adapter: Arc<dyn OcrAdapter>, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            adapter,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Pool sized by [`RedactionConfig::ocr_workers`].
    pub fn from_config(adapter: Arc<dyn OcrAdapter>, config: &RedactionConfig) -> Self {
        Self::new(adapter, config.ocr_workers)
    }

    /// Pool with the default single worker.
    pub fn single(adapter: impl OcrAdapter + 'static) -> Self {
        Self::new(Arc::new(adapter), 1)
    }

    pub fn adapter(&self) -> &Arc<dyn OcrAdapter> {
        &self.adapter
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the adapter on `image` under a permit.
    ///
    /// The permit moves into the blocking task, so it stays held until the
    /// adapter returns even if the calling future is dropped. Adapter
    /// failures surface as [`RedactError::UpstreamRecognition`] and are
    /// not retried.
    pub async fn recognize(
        &self,
        image: Arc<DynamicImage>,
        source: &Path,
    ) -> Result<Vec<TextSpan>, RedactError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| RedactError::Internal(format!("OCR pool closed: {e}")))?;

        let adapter = Arc::clone(&self.adapter);
        let path = source.to_path_buf();
        let task_path = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            adapter.recognize(&image, &task_path)
        })
        .await
        .map_err(|e| RedactError::Internal(format!("OCR task panicked: {e}")))?;

        match result {
            Ok(spans) => {
                debug!(
                    "OCR '{}' returned {} spans for {}",
                    self.adapter.name(),
                    spans.len(),
                    path.display()
                );
                Ok(spans)
            }
            Err(source) => Err(RedactError::UpstreamRecognition { path, source }),
        }
    }
}

// ── Sidecar JSON adapter ─────────────────────────────────────────────────

/// Where [`SidecarOcr`] finds the span file for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanSource {
    /// One span file used for every image.
    File(PathBuf),
    /// `<dir>/<image stem>.json`.
    Directory(PathBuf),
    /// `<image path with .json extension>`, next to the image.
    Adjacent,
}

impl SpanSource {
    /// Pick `File` or `Directory` depending on what `path` is on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            SpanSource::Directory(path)
        } else {
            SpanSource::File(path)
        }
    }

    /// Span file for `image`.
    pub fn locate(&self, image: &Path) -> PathBuf {
        match self {
            SpanSource::File(p) => p.clone(),
            SpanSource::Directory(dir) => {
                let stem = image.file_stem().unwrap_or(image.as_os_str());
                dir.join(format!("{}.json", stem.to_string_lossy()))
            }
            SpanSource::Adjacent => image.with_extension("json"),
        }
    }
}

/// Reads pre-computed OCR output from JSON files.
#[derive(Debug, Clone)]
pub struct SidecarOcr {
    source: SpanSource,
}

impl SidecarOcr {
    pub fn new(source: SpanSource) -> Self {
        Self { source }
    }

    pub fn span_source(&self) -> &SpanSource {
        &self.source
    }
}

impl OcrAdapter for SidecarOcr {
    fn name(&self) -> &str {
        "sidecar-json"
    }

    fn recognize(&self, _image: &DynamicImage, source: &Path) -> Result<Vec<TextSpan>, OcrError> {
        let span_file = self.source.locate(source);
        let json = std::fs::read_to_string(&span_file)
            .map_err(|e| format!("cannot read span file '{}': {e}", span_file.display()))?;
        let spans = parse_spans(&json, &span_file.display().to_string())?;
        Ok(spans)
    }

    fn accepts_downscaled(&self) -> bool {
        false
    }
}

// ── Static adapter ───────────────────────────────────────────────────────

/// Returns the same spans for every image.
#[derive(Debug, Clone, Default)]
pub struct StaticOcr {
    spans: Vec<TextSpan>,
}

impl StaticOcr {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        Self { spans }
    }
}

impl OcrAdapter for StaticOcr {
    fn name(&self) -> &str {
        "static"
    }

    fn recognize(&self, _image: &DynamicImage, _source: &Path) -> Result<Vec<TextSpan>, OcrError> {
        Ok(self.spans.clone())
    }

    fn accepts_downscaled(&self) -> bool {
        false
    }
}
