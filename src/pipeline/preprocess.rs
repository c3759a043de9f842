//! OCR-input preparation: cap the longest edge before recognition.
//!
//! Recognisers slow down roughly with pixel count and gain little accuracy
//! past ~1200 px on an ID card, so large photographs are shrunk first. The
//! spans that come back are in the shrunken coordinate space; [`OcrInput::
//! restore`] maps them back so the reconciler paints on the full-resolution
//! raster the caller sent.

use crate::span::TextSpan;
use image::imageops::FilterType;
use image::DynamicImage;
use std::sync::Arc;
use tracing::debug;

/// The raster handed to the OCR adapter plus the factors that undo any
/// resize.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub image: Arc<DynamicImage>,
    resized: bool,
    /// Full-resolution width divided by OCR-input width.
    pub scale_x: f64,
    /// Full-resolution height divided by OCR-input height.
    pub scale_y: f64,
}

impl OcrInput {
    pub fn is_resized(&self) -> bool {
        self.resized
    }

    /// Map spans recognised on [`Self::image`] back to full resolution.
    pub fn restore(&self, spans: Vec<TextSpan>) -> Vec<TextSpan> {
        if !self.is_resized() {
            return spans;
        }
        spans
            .into_iter()
            .map(|s| s.scaled(self.scale_x, self.scale_y))
            .collect()
    }
}

/// Prepare `image` for recognition, fitting it within `max_dim` on its
/// longest edge. Images already within the limit are shared, not copied;
/// `max_dim == 0` disables the cap.
pub fn prepare_ocr_input(image: &Arc<DynamicImage>, max_dim: u32) -> OcrInput {
    let (w, h) = (image.width(), image.height());
    if max_dim == 0 || w.max(h) <= max_dim || w == 0 || h == 0 {
        return OcrInput {
            image: Arc::clone(image),
            resized: false,
            scale_x: 1.0,
            scale_y: 1.0,
        };
    }

    // `resize` preserves aspect ratio and fits within the given bounds.
    let small = image.resize(max_dim, max_dim, FilterType::Triangle);
    let (sw, sh) = (small.width().max(1), small.height().max(1));
    debug!("OCR input downscaled {}x{} → {}x{}", w, h, sw, sh);

    OcrInput {
        image: Arc::new(small),
        resized: true,
        scale_x: w as f64 / sw as f64,
        scale_y: h as f64 / sh as f64,
    }
}
