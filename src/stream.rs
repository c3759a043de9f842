//! Batch redaction: many inputs, bounded concurrency.
//!
//! [`redact_stream`] yields a [`BatchItem`] per input as each finishes, so
//! items may arrive out of order (sort by `index` if order matters).
//! [`redact_batch`] drives the stream to completion and returns items in
//! input order. A failing input never aborts the others; its error is
//! carried in its own item.
//!
//! OCR calls are still limited by the [`OcrPool`]'s permits, so
//! `concurrency` mostly overlaps decoding, painting and encoding of one
//! input with recognition of another.

use crate::config::RedactionConfig;
use crate::error::RedactError;
use crate::ocr::OcrPool;
use crate::output::{OutputTarget, RedactionReport};
use crate::redact::redact_into;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{info, warn};

/// Outcome for one input of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// 0-based position of the input in the batch.
    pub index: usize,
    pub input: PathBuf,
    pub result: Result<RedactionReport, RedactError>,
}

/// A boxed stream of batch items.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Redact `inputs`, yielding items as they complete.
///
/// Runs up to `config.concurrency` inputs at a time. Per-input progress
/// events (`on_input_*`) fire from the stream; batch-level events are
/// fired by [`redact_batch`].
pub fn redact_stream(
    inputs: Vec<PathBuf>,
    target: OutputTarget,
    ocr: OcrPool,
    config: RedactionConfig,
) -> BatchStream {
    let total = inputs.len();
    let concurrency = config.concurrency.max(1);

    let s = stream::iter(inputs.into_iter().enumerate().map(move |(index, input)| {
        let ocr = ocr.clone();
        let cfg = config.clone();
        let target = target.clone();
        async move {
            if let Some(ref cb) = cfg.progress_callback {
                cb.on_input_start(index, total);
            }
            let result = redact_into(&input, &target, &ocr, &cfg).await;
            match &result {
                Ok(report) => {
                    if let Some(ref cb) = cfg.progress_callback {
                        cb.on_input_complete(index, total, report.stats.rects_applied);
                    }
                }
                Err(e) => {
                    warn!("Input {} failed: {}", input.display(), e);
                    if let Some(ref cb) = cfg.progress_callback {
                        cb.on_input_error(index, total, &e.to_string());
                    }
                }
            }
            BatchItem {
                index,
                input,
                result,
            }
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

/// Redact `inputs` and return one item per input, in input order.
pub async fn redact_batch(
    inputs: Vec<PathBuf>,
    target: OutputTarget,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Vec<BatchItem> {
    let total = inputs.len();
    info!(
        "Starting batch: {} inputs, concurrency {}",
        total, config.concurrency
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut items: Vec<BatchItem> = redact_stream(inputs, target, ocr.clone(), config.clone())
        .collect()
        .await;
    items.sort_by_key(|item| item.index);

    let succeeded = items.iter().filter(|i| i.result.is_ok()).count();
    info!("Batch complete: {}/{} inputs succeeded", succeeded, total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, succeeded);
    }
    items
}
