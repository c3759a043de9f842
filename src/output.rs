//! Result types returned by the redaction entry points.
//!
//! [`RedactionOutcome`] carries the raster; [`RedactionReport`] is its
//! serialisable, text-free summary. Nothing in this module retains the
//! recognised text of a span.

use crate::error::GeometryFault;
use crate::pipeline::input::masked_path;
use crate::pipeline::reconcile::RedactionRect;
use crate::span::PiiLabel;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A redacted raster and the rectangles painted on it.
#[derive(Debug, Clone)]
pub struct RedactionResult {
    /// Same dimensions and colour type as the input.
    pub image: DynamicImage,
    pub rects: Vec<RedactionRect>,
}

impl RedactionResult {
    /// Rectangles that covered at least one pixel.
    pub fn rects_applied(&self) -> usize {
        self.rects.iter().filter(|r| !r.is_degenerate()).count()
    }
}

/// What a redaction request produced.
#[derive(Debug, Clone)]
pub enum RedactionOutcome {
    Redacted(RedactionResult),
    /// The classifier found nothing; no artifact is produced.
    NoPiiFound,
}

impl RedactionOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            RedactionOutcome::Redacted(_) => OutcomeKind::Redacted,
            RedactionOutcome::NoPiiFound => OutcomeKind::NoPiiFound,
        }
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        match self {
            RedactionOutcome::Redacted(r) => Some(&r.image),
            RedactionOutcome::NoPiiFound => None,
        }
    }

    pub fn rects(&self) -> &[RedactionRect] {
        match self {
            RedactionOutcome::Redacted(r) => &r.rects,
            RedactionOutcome::NoPiiFound => &[],
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, RedactionOutcome::Redacted(_))
    }
}

/// Serialisable tag for [`RedactionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Redacted,
    NoPiiFound,
}

/// Counters and timings for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactionStats {
    /// Spans returned by OCR.
    pub spans_total: usize,
    /// PII spans dropped because their geometry could not be reconciled.
    pub spans_skipped: usize,
    /// Spans the classifier flagged.
    pub matches: usize,
    /// Rectangles that covered at least one pixel.
    pub rects_applied: usize,
    /// Matches per label.
    pub label_counts: BTreeMap<PiiLabel, usize>,
    /// Geometry faults per skipped span, as `(span_index, fault)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<(usize, GeometryFault)>,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Text-free summary of a request, suitable for logs and `--json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionReport {
    /// Caller-facing identifier of the input (path or `<upload>`).
    pub input: String,
    /// Where the artifact was written, if anywhere.
    pub output: Option<PathBuf>,
    pub outcome: OutcomeKind,
    pub width: u32,
    pub height: u32,
    pub rects: Vec<RedactionRect>,
    pub stats: RedactionStats,
}

impl RedactionReport {
    /// Human message matching the outcome.
    pub fn message(&self) -> &'static str {
        match self.outcome {
            OutcomeKind::Redacted => "PII masked",
            OutcomeKind::NoPiiFound => "No PII detected",
        }
    }
}

/// Everything [`crate::redact::redact`] returns.
#[derive(Debug, Clone)]
pub struct RedactionOutput {
    pub outcome: RedactionOutcome,
    /// Container format of the input, reused for the artifact.
    pub format: ImageFormat,
    pub report: RedactionReport,
}

/// One detection as exposed by [`crate::redact::detect`]: label and
/// location, never the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub label: PiiLabel,
    pub confidence: f32,
    pub span_index: usize,
    pub rect: RedactionRect,
}

/// Where the redacted artifact of an input goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Keep the result in memory; write nothing.
    #[default]
    None,
    /// Exactly this path.
    File(PathBuf),
    /// `<stem>_masked.<ext>` next to the input.
    Beside,
    /// `<dir>/<stem>_masked.<ext>`.
    Directory(PathBuf),
}

impl OutputTarget {
    /// Destination for `input`, whose detected format is `format`.
    pub fn resolve(&self, input: &Path, format: ImageFormat) -> Option<PathBuf> {
        match self {
            OutputTarget::None => None,
            OutputTarget::File(p) => Some(p.clone()),
            OutputTarget::Beside => Some(masked_path(input, format)),
            OutputTarget::Directory(dir) => {
                let beside = masked_path(input, format);
                beside.file_name().map(|name| dir.join(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rects_applied_ignores_degenerate() {
        let r = RedactionResult {
            image: DynamicImage::new_rgb8(4, 4),
            rects: vec![
                RedactionRect::new(0, 0, 2, 2),
                RedactionRect::new(3, 0, 3, 3),
                RedactionRect::collapsed(3, 3, 3, 3),
            ],
        };
        assert_eq!(r.rects_applied(), 2);
    }

    #[test]
    fn no_pii_outcome_has_no_image() {
        let o = RedactionOutcome::NoPiiFound;
        assert_eq!(o.kind(), OutcomeKind::NoPiiFound);
        assert!(o.image().is_none());
        assert!(o.rects().is_empty());
        assert!(!o.is_redacted());
    }

    #[test]
    fn output_target_resolution() {
        let input = Path::new("/in/card.jpg");
        assert_eq!(OutputTarget::None.resolve(input, ImageFormat::Jpeg), None);
        assert_eq!(
            OutputTarget::Beside.resolve(input, ImageFormat::Jpeg),
            Some(PathBuf::from("/in/card_masked.jpg"))
        );
        assert_eq!(
            OutputTarget::Directory("/out".into()).resolve(input, ImageFormat::Jpeg),
            Some(PathBuf::from("/out/card_masked.jpg"))
        );
        assert_eq!(
            OutputTarget::File("/x/y.jpg".into()).resolve(input, ImageFormat::Jpeg),
            Some(PathBuf::from("/x/y.jpg"))
        );
    }

    #[test]
    fn report_serialises_without_text() {
        let mut stats = RedactionStats {
            spans_total: 3,
            matches: 1,
            rects_applied: 1,
            ..Default::default()
        };
        stats.label_counts.insert(PiiLabel::Aadhaar, 1);
        let report = RedactionReport {
            input: "card.png".into(),
            output: Some(PathBuf::from("card_masked.png")),
            outcome: OutcomeKind::Redacted,
            width: 640,
            height: 480,
            rects: vec![RedactionRect::new(10, 10, 100, 30)],
            stats,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"outcome\":\"redacted\""), "{json}");
        assert!(json.contains("\"aadhaar\":1"), "{json}");
        assert!(!json.contains("faults"), "{json}");
        assert_eq!(report.message(), "PII masked");

        let back: RedactionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
