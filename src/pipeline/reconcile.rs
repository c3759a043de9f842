//! Region reconciliation: quadrilateral → clamped axis-aligned rectangle.
//!
//! OCR boundaries are rotated, reordered, fractional, partly off-canvas or
//! simply broken. The reconciler takes the min/max over the four corners
//! (so any point order and any rotation yields a covering box), grows it
//! outward to whole pixels, and clamps each edge independently into the
//! raster. Broken boundaries are reported as a [`GeometryFault`] for that
//! span only; the rest of the batch is unaffected.

use crate::error::GeometryFault;
use crate::span::{PiiMatch, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inclusive pixel rectangle, always inside `[0, w-1] × [0, h-1]` of the
/// raster it was reconciled against.
///
/// A one-pixel-wide rectangle (`x1 == x2`) is a real column. Only a
/// boundary lying wholly beyond one edge of the canvas collapses, and that
/// is recorded when the rectangle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedactionRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    collapsed: bool,
}

impl RedactionRect {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            collapsed: false,
        }
    }

    /// Edge-clamped remains of a boundary that lay entirely off-canvas.
    pub fn collapsed(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            collapsed: true,
            ..Self::new(x1, y1, x2, y2)
        }
    }

    /// Zero-area rectangle: an off-canvas boundary or inverted corners.
    /// Painting it is a no-op.
    pub fn is_degenerate(&self) -> bool {
        self.collapsed || self.x1 > self.x2 || self.y1 > self.y2
    }

    /// Painted width in pixels (inclusive edges); 0 when degenerate.
    pub fn width(&self) -> u32 {
        if self.is_degenerate() {
            0
        } else {
            self.x2 - self.x1 + 1
        }
    }

    /// Painted height in pixels (inclusive edges); 0 when degenerate.
    pub fn height(&self) -> u32 {
        if self.is_degenerate() {
            0
        } else {
            self.y2 - self.y1 + 1
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        !self.is_degenerate() && (self.x1..=self.x2).contains(&x) && (self.y1..=self.y2).contains(&y)
    }
}

/// Rectangles that survived reconciliation plus the spans that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub rects: Vec<RedactionRect>,
    /// `(span_index, fault)` for every skipped match.
    pub faults: Vec<(usize, GeometryFault)>,
}

/// Validate one boundary and turn it into a rectangle.
///
/// `padding` grows the box on every side before clamping.
pub fn reconcile_boundary(
    boundary: &[Point],
    width: u32,
    height: u32,
    padding: u32,
) -> Result<RedactionRect, GeometryFault> {
    if width == 0 || height == 0 {
        return Err(GeometryFault::EmptyImage);
    }
    if boundary.len() != 4 {
        return Err(GeometryFault::WrongPointCount(boundary.len()));
    }
    if !boundary.iter().all(Point::is_finite) {
        return Err(GeometryFault::NonFiniteCoordinate);
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in boundary {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let pad = padding as f64;
    let (lx, hx) = ((min_x - pad).floor(), (max_x + pad).ceil());
    let (ly, hy) = ((min_y - pad).floor(), (max_y + pad).ceil());
    let (x1, x2) = (clamp_axis(lx, width), clamp_axis(hx, width));
    let (y1, y2) = (clamp_axis(ly, height), clamp_axis(hy, height));

    if off_axis(lx, hx, width) || off_axis(ly, hy, height) {
        Ok(RedactionRect::collapsed(x1, y1, x2, y2))
    } else {
        Ok(RedactionRect::new(x1, y1, x2, y2))
    }
}

/// Both ends of `[lo, hi]` fall past the same side of `[0, extent - 1]`.
fn off_axis(lo: f64, hi: f64, extent: u32) -> bool {
    hi < 0.0 || lo > (extent - 1) as f64
}

/// Clamp a finite coordinate into `[0, extent - 1]`. `extent` is non-zero.
fn clamp_axis(v: f64, extent: u32) -> u32 {
    let max = (extent - 1) as f64;
    // `as` saturates, but clamp first so huge values land on the edge exactly.
    v.clamp(0.0, max) as u32
}

/// Reconcile every match, keeping a record of skipped spans.
pub fn reconcile_all(
    matches: &[PiiMatch],
    width: u32,
    height: u32,
    padding: u32,
) -> Reconciliation {
    let mut out = Reconciliation {
        rects: Vec::with_capacity(matches.len()),
        faults: Vec::new(),
    };
    for m in matches {
        match reconcile_boundary(&m.boundary, width, height, padding) {
            Ok(rect) => out.rects.push(rect),
            Err(fault) => {
                debug!(span = m.span_index, label = %m.label, %fault, "Skipping span geometry");
                out.faults.push((m.span_index, fault));
            }
        }
    }
    out
}

/// Convert matches to rectangles on a `width × height` raster, silently
/// skipping malformed geometry.
pub fn reconcile(matches: &[PiiMatch], width: u32, height: u32) -> Vec<RedactionRect> {
    reconcile_all(matches, width, height, 0).rects
}
