//! Per-input redaction entry points.
//!
//! Each call runs the full pipeline for one image: resolve, decode,
//! recognise, classify, reconcile, rasterise and (optionally) persist.
//! See [`crate::stream`] for running many inputs with bounded concurrency.

use crate::config::RedactionConfig;
use crate::error::RedactError;
use crate::ocr::OcrPool;
use crate::output::{
    DetectedRegion, OutputTarget, RedactionOutcome, RedactionOutput, RedactionReport,
    RedactionResult, RedactionStats,
};
use crate::pipeline::classify::Classifier;
use crate::pipeline::encode::{decode_image, encode_image};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::preprocess::prepare_ocr_input;
use crate::pipeline::rasterize::rasterize;
use crate::pipeline::reconcile::{reconcile_all, reconcile_boundary};
use crate::span::TextSpan;
use image::{DynamicImage, ImageFormat};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Label used in reports and errors for in-memory uploads.
pub const UPLOAD_LABEL: &str = "<upload>";

/// Redact an already-decoded image given its OCR spans.
///
/// Synchronous core of the pipeline: classify, reconcile, rasterise. The
/// input image is never modified. Spans whose geometry cannot be reconciled
/// are skipped and counted in [`RedactionStats::spans_skipped`].
pub fn redact_image(
    image: &DynamicImage,
    spans: &[TextSpan],
    config: &RedactionConfig,
) -> (RedactionOutcome, RedactionStats) {
    let matches = Classifier::from_config(config).classify(spans);

    let mut stats = RedactionStats {
        spans_total: spans.len(),
        matches: matches.len(),
        ..Default::default()
    };
    for m in &matches {
        *stats.label_counts.entry(m.label).or_default() += 1;
        trace!(span = m.span_index, label = %m.label, text = %m.matched_text, "PII match");
    }

    if matches.is_empty() {
        return (RedactionOutcome::NoPiiFound, stats);
    }

    let rec = reconcile_all(&matches, image.width(), image.height(), config.padding);
    if rec.rects.is_empty() {
        warn!(
            "{} PII spans found but none had usable geometry; nothing painted",
            matches.len()
        );
    }
    stats.spans_skipped = rec.faults.len();
    stats.faults = rec.faults;

    let result = RedactionResult {
        image: rasterize(image, &rec.rects, config.fill),
        rects: rec.rects,
    };
    stats.rects_applied = result.rects_applied();
    (RedactionOutcome::Redacted(result), stats)
}

/// Redact an image file.
///
/// # Errors
/// Fatal problems only: unreadable or invalid input, decode failure, OCR
/// failure. "No PII found" is `Ok` with [`RedactionOutcome::NoPiiFound`].
pub async fn redact(
    input: impl AsRef<Path>,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<RedactionOutput, RedactError> {
    let input = input.as_ref();
    let resolved = input::resolve_input(input, config.max_upload_bytes)?;
    let (output, _) = run(&resolved, input.display().to_string(), ocr, config, false).await?;
    Ok(output)
}

/// Redact an image file and write the artifact to `output_path`.
///
/// The file is written atomically (temp file in the same directory, then
/// rename). Nothing is written when no PII is found; the returned report's
/// `output` is `None` in that case.
pub async fn redact_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<RedactionReport, RedactError> {
    let target = OutputTarget::File(output_path.as_ref().to_path_buf());
    redact_into(input, &target, ocr, config).await
}

/// Redact an image file, writing the artifact wherever `target` says.
pub async fn redact_into(
    input: impl AsRef<Path>,
    target: &OutputTarget,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<RedactionReport, RedactError> {
    let input = input.as_ref();
    let resolved = input::resolve_input(input, config.max_upload_bytes)?;
    let want_bytes = *target != OutputTarget::None;
    let (output, bytes) = run(&resolved, input.display().to_string(), ocr, config, want_bytes).await?;

    let mut report = output.report;
    if let (Some(bytes), Some(dest)) = (bytes, target.resolve(input, output.format)) {
        write_atomic(&dest, bytes).await?;
        info!("Wrote {}", dest.display());
        report.output = Some(dest);
    }
    Ok(report)
}

/// Redact an in-memory upload.
///
/// `content_type`, when given, must be `image/*`. The bytes are spilled to
/// a temp file that is removed before this returns.
pub async fn redact_bytes(
    bytes: &[u8],
    content_type: Option<&str>,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<RedactionOutput, RedactError> {
    let resolved = input::resolve_upload(bytes, content_type, config.max_upload_bytes)?;
    let (output, _) = run(&resolved, UPLOAD_LABEL.to_string(), ocr, config, false).await?;
    Ok(output)
}

/// Synchronous wrapper around [`redact`].
///
/// Creates a temporary tokio runtime internally.
pub fn redact_sync(
    input: impl AsRef<Path>,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<RedactionOutput, RedactError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RedactError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(redact(input, ocr, config))
}

/// Locate PII in an image file without painting anything.
///
/// Returns one region per match whose geometry reconciles; matched text is
/// not exposed.
pub async fn detect(
    input: impl AsRef<Path>,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<Vec<DetectedRegion>, RedactError> {
    let input = input.as_ref();
    let resolved = input::resolve_input(input, config.max_upload_bytes)?;
    let rec = recognize(&resolved, ocr, config).await?;
    let (w, h) = (rec.image.width(), rec.image.height());

    let regions = Classifier::from_config(config)
        .classify(&rec.spans)
        .into_iter()
        .filter_map(|m| {
            reconcile_boundary(&m.boundary, w, h, config.padding)
                .map_err(|fault| debug!(span = m.span_index, %fault, "Skipping span geometry"))
                .ok()
                .map(|rect| DetectedRegion {
                    label: m.label,
                    confidence: m.confidence,
                    span_index: m.span_index,
                    rect,
                })
        })
        .collect::<Vec<_>>();

    info!("Detected {} PII regions in {}", regions.len(), input.display());
    Ok(regions)
}

/// Encode the redacted raster in the input's format. `None` when there was
/// nothing to redact.
pub fn encode_output(output: &RedactionOutput) -> Result<Option<Vec<u8>>, RedactError> {
    match &output.outcome {
        RedactionOutcome::Redacted(r) => {
            encode_image(&r.image, output.format, Path::new(&output.report.input)).map(Some)
        }
        RedactionOutcome::NoPiiFound => Ok(None),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Decoded input plus the spans recognised on it, in full-resolution space.
struct Recognized {
    image: Arc<DynamicImage>,
    format: ImageFormat,
    spans: Vec<TextSpan>,
    ocr_duration_ms: u64,
}

async fn recognize(
    resolved: &ResolvedInput,
    ocr: &OcrPool,
    config: &RedactionConfig,
) -> Result<Recognized, RedactError> {
    let path = resolved.path().to_path_buf();
    let format = resolved.format();
    let max_dim = if ocr.adapter().accepts_downscaled() {
        config.max_ocr_dimension
    } else {
        0
    };

    let (image, format, ocr_input) = tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
        let img = Arc::new(decode_image(&bytes, format, &path)?);
        let ocr_input = prepare_ocr_input(&img, max_dim);
        Ok::<_, RedactError>((img, format, ocr_input))
    })
    .await
    .map_err(|e| RedactError::Internal(format!("Decode task panicked: {}", e)))??;

    let ocr_start = Instant::now();
    let spans = ocr
        .recognize(Arc::clone(&ocr_input.image), resolved.path())
        .await?;
    let spans = ocr_input.restore(spans);
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    Ok(Recognized {
        image,
        format,
        spans,
        ocr_duration_ms,
    })
}

/// Full pipeline for one resolved input. When `want_bytes` is set and PII
/// was found, the artifact is encoded on the same blocking thread.
async fn run(
    resolved: &ResolvedInput,
    label: String,
    ocr: &OcrPool,
    config: &RedactionConfig,
    want_bytes: bool,
) -> Result<(RedactionOutput, Option<Vec<u8>>), RedactError> {
    let total_start = Instant::now();
    info!("Redacting {}", label);

    let rec = recognize(resolved, ocr, config).await?;
    let (width, height) = (rec.image.width(), rec.image.height());
    let format = rec.format;

    let image = Arc::clone(&rec.image);
    let spans = rec.spans;
    let cfg = config.clone();
    let dest = PathBuf::from(&label);
    let (outcome, mut stats, bytes) = tokio::task::spawn_blocking(move || {
        let (outcome, stats) = redact_image(&image, &spans, &cfg);
        let bytes = match (&outcome, want_bytes) {
            (RedactionOutcome::Redacted(r), true) => Some(encode_image(&r.image, format, &dest)?),
            _ => None,
        };
        Ok::<_, RedactError>((outcome, stats, bytes))
    })
    .await
    .map_err(|e| RedactError::Internal(format!("Redaction task panicked: {}", e)))??;

    stats.ocr_duration_ms = rec.ocr_duration_ms;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    let report = RedactionReport {
        input: label,
        output: None,
        outcome: outcome.kind(),
        width,
        height,
        rects: outcome.rects().to_vec(),
        stats,
    };

    info!(
        "{}: {} ({} spans, {} matches, {} regions, {} skipped, {}ms)",
        report.input,
        report.message(),
        report.stats.spans_total,
        report.stats.matches,
        report.stats.rects_applied,
        report.stats.spans_skipped,
        report.stats.total_duration_ms
    );

    Ok((
        RedactionOutput {
            outcome,
            format,
            report,
        },
        bytes,
    ))
}

/// Write `bytes` to `path` via a temp file in the same directory.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), RedactError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let write_err = |source: std::io::Error| RedactError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| RedactError::Internal(format!("Write task panicked: {}", e)))?
}

fn read_error(path: &Path, e: std::io::Error) -> RedactError {
    match e.kind() {
        std::io::ErrorKind::NotFound => RedactError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => RedactError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RedactError::Internal(format!("read {}: {}", path.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rasterize::FillMode;
    use crate::pipeline::reconcile::RedactionRect;
    use crate::span::PiiLabel;
    use image::{Rgb, RgbImage};

    fn white(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }

    fn span(corners: &[(i64, i64)], text: &str) -> TextSpan {
        TextSpan::from_corners(corners, text, 0.9)
    }

    #[test]
    fn aadhaar_line_is_blacked_out() {
        let img = white(640, 480);
        let spans = vec![span(&[(10, 10), (100, 10), (100, 30), (10, 30)], "1234 5678 9012")];
        let (outcome, stats) = redact_image(&img, &spans, &RedactionConfig::default());

        let RedactionOutcome::Redacted(result) = outcome else {
            panic!("expected Redacted");
        };
        assert_eq!(result.rects, vec![RedactionRect::new(10, 10, 100, 30)]);
        let out = result.image.to_rgb8();
        assert_eq!(out.get_pixel(50, 20), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(5, 5), &Rgb([255, 255, 255]));
        assert_eq!(stats.label_counts.get(&PiiLabel::Aadhaar), Some(&1));
        assert_eq!(stats.rects_applied, 1);
    }

    #[test]
    fn no_pii_leaves_image_alone() {
        let img = white(64, 64);
        let spans = vec![span(&[(0, 0), (10, 0), (10, 10), (0, 10)], "Government of India")];
        let (outcome, stats) = redact_image(&img, &spans, &RedactionConfig::default());
        assert!(matches!(outcome, RedactionOutcome::NoPiiFound));
        assert_eq!(stats.matches, 0);
        assert_eq!(stats.spans_total, 1);
    }

    #[test]
    fn broken_geometry_is_counted_not_fatal() {
        let img = white(200, 100);
        let spans = vec![
            span(&[(0, 0), (10, 0), (10, 10)], "9876543210"),
            span(&[(20, 20), (80, 20), (80, 40), (20, 40)], "priya@example.com"),
        ];
        let (outcome, stats) = redact_image(&img, &spans, &RedactionConfig::default());
        assert_eq!(outcome.rects().len(), 1);
        assert_eq!(stats.spans_skipped, 1);
        assert_eq!(stats.matches, 2);
        assert_eq!(stats.faults[0].0, 0);
    }

    #[test]
    fn disabled_labels_are_not_redacted() {
        let img = white(200, 100);
        let spans = vec![span(&[(0, 0), (50, 0), (50, 10), (0, 10)], "9876543210")];
        let config = RedactionConfig::builder()
            .labels([PiiLabel::Aadhaar])
            .build()
            .unwrap();
        let (outcome, _) = redact_image(&img, &spans, &config);
        assert!(!outcome.is_redacted());
    }

    #[test]
    fn fill_and_padding_come_from_config() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([10, 10, 10])));
        let spans = vec![span(&[(40, 40), (60, 40), (60, 50), (40, 50)], "1234 5678 9012")];
        let config = RedactionConfig::builder()
            .fill(FillMode::WHITE)
            .padding(5)
            .build()
            .unwrap();
        let (outcome, _) = redact_image(&img, &spans, &config);
        assert_eq!(outcome.rects(), &[RedactionRect::new(35, 35, 65, 55)]);
        let out = outcome.image().unwrap().to_rgb8();
        assert_eq!(out.get_pixel(36, 36), &Rgb([255, 255, 255]));
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out.png");
        write_atomic(&dest, b"abc".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
        let siblings = std::fs::read_dir(dest.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1);
    }
}
