//! Recognised text spans and the PII found in them.
//!
//! A [`TextSpan`] is what the OCR adapter hands over: a quadrilateral, the
//! text read inside it, and a confidence. The classifier turns spans into
//! [`PiiMatch`]es; only the boundary of a match travels further down the
//! pipeline.

use crate::error::RedactError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A point in image pixel space.
///
/// Coordinates that were not numeric in the OCR output are stored as NaN
/// so the reconciler can reject the span instead of the parser failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// One OCR-recognised text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Corner points, nominally four and clockwise from top-left, but OCR
    /// engines emit rotated, reordered and occasionally malformed polygons.
    pub boundary: Vec<Point>,
    pub text: String,
    /// Recogniser confidence in `[0, 1]`.
    pub confidence: f32,
}

impl TextSpan {
    pub fn new(boundary: Vec<Point>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            boundary,
            text: text.into(),
            confidence,
        }
    }

    /// Convenience constructor from `(x, y)` integer corners.
    pub fn from_corners(corners: &[(i64, i64)], text: impl Into<String>, confidence: f32) -> Self {
        let boundary = corners
            .iter()
            .map(|&(x, y)| Point::new(x as f64, y as f64))
            .collect();
        Self::new(boundary, text, confidence)
    }

    /// Map the boundary from OCR-input space back to full-resolution space.
    pub fn scaled(mut self, sx: f64, sy: f64) -> Self {
        for p in &mut self.boundary {
            p.x *= sx;
            p.y *= sy;
        }
        self
    }
}

/// The closed set of PII categories, in evaluation-priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PiiLabel {
    Aadhaar,
    Phone,
    Dob,
    Email,
    Name,
    Address,
}

impl PiiLabel {
    pub const ALL: [PiiLabel; 6] = [
        PiiLabel::Aadhaar,
        PiiLabel::Phone,
        PiiLabel::Dob,
        PiiLabel::Email,
        PiiLabel::Name,
        PiiLabel::Address,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiLabel::Aadhaar => "aadhaar",
            PiiLabel::Phone => "phone",
            PiiLabel::Dob => "dob",
            PiiLabel::Email => "email",
            PiiLabel::Name => "name",
            PiiLabel::Address => "address",
        }
    }
}

impl fmt::Display for PiiLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PiiLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aadhaar" | "aadhar" => Ok(PiiLabel::Aadhaar),
            "phone" | "mobile" => Ok(PiiLabel::Phone),
            "dob" => Ok(PiiLabel::Dob),
            "email" => Ok(PiiLabel::Email),
            "name" => Ok(PiiLabel::Name),
            "address" => Ok(PiiLabel::Address),
            other => Err(format!(
                "unknown PII label '{other}' (expected aadhaar, phone, dob, email, name, address)"
            )),
        }
    }
}

/// A span the classifier decided carries PII.
///
/// `matched_text` is kept for callers that inspect detections in memory; it
/// is never written into reports or logs above `trace` level.
#[derive(Debug, Clone, PartialEq)]
pub struct PiiMatch {
    pub label: PiiLabel,
    pub matched_text: String,
    pub boundary: Vec<Point>,
    pub confidence: f32,
    /// Position of the source span in the OCR output.
    pub span_index: usize,
}

// ── OCR output parsing ───────────────────────────────────────────────────

/// Parse OCR output serialised as JSON.
///
/// Two element shapes are accepted and may be mixed:
///
/// ```text
/// [[[x, y], [x, y], [x, y], [x, y]], "text", 0.93]           (EasyOCR tuple)
/// {"boundary": [[x, y], …] | [{"x": …, "y": …}, …], "text": "…", "confidence": 0.93}
/// ```
///
/// Only a non-array document is an error. Anything inside an element that
/// does not fit is kept as broken geometry or empty text so the pipeline
/// can skip it per span.
pub fn parse_spans(json: &str, source: &str) -> Result<Vec<TextSpan>, RedactError> {
    let doc: Value = serde_json::from_str(json).map_err(|e| RedactError::MalformedInput {
        input: source.to_string(),
        reason: format!("span document is not valid JSON: {e}"),
    })?;

    let Value::Array(items) = doc else {
        return Err(RedactError::MalformedInput {
            input: source.to_string(),
            reason: "span document must be a JSON array".into(),
        });
    };

    let mut spans = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match span_from_value(item) {
            Some(span) => spans.push(span),
            None => debug!("Span {} in {}: unrecognised element shape, ignored", i, source),
        }
    }
    Ok(spans)
}

fn span_from_value(v: &Value) -> Option<TextSpan> {
    let (boundary, text, confidence) = match v {
        Value::Array(parts) => (parts.first(), parts.get(1), parts.get(2)),
        Value::Object(map) => (
            map.get("boundary").or_else(|| map.get("bbox")),
            map.get("text"),
            map.get("confidence").or_else(|| map.get("score")),
        ),
        _ => return None,
    };

    let boundary = match boundary {
        Some(Value::Array(points)) => points.iter().map(point_from_value).collect(),
        _ => Vec::new(),
    };
    let text = text.and_then(Value::as_str).unwrap_or_default().to_string();
    let confidence = confidence.and_then(Value::as_f64).unwrap_or(0.0) as f32;

    Some(TextSpan {
        boundary,
        text,
        confidence,
    })
}

fn point_from_value(v: &Value) -> Point {
    match v {
        Value::Array(xy) if xy.len() == 2 => Point::new(coord(&xy[0]), coord(&xy[1])),
        Value::Object(map) => Point::new(
            map.get("x").map(coord).unwrap_or(f64::NAN),
            map.get("y").map(coord).unwrap_or(f64::NAN),
        ),
        _ => Point::new(f64::NAN, f64::NAN),
    }
}

fn coord(v: &Value) -> f64 {
    v.as_f64().unwrap_or(f64::NAN)
}
