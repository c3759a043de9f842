//! Rasterisation: paint reconciled rectangles onto a copy of the image.
//!
//! Solid fill is the default because it destroys the pixels outright.
//! Gaussian blur is available for previews, but a blurred box around a
//! short, high-contrast number can often be read back, so it is opt-in only.

use crate::pipeline::reconcile::RedactionRect;
use image::{DynamicImage, GenericImageView, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a redaction rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Opaque fill with an RGB colour.
    Solid { colour: [u8; 3] },
    /// Gaussian blur of the region with the given sigma.
    Blur { sigma: f32 },
}

impl FillMode {
    pub const BLACK: FillMode = FillMode::Solid { colour: [0, 0, 0] };
    pub const WHITE: FillMode = FillMode::Solid {
        colour: [255, 255, 255],
    };
}

impl Default for FillMode {
    fn default() -> Self {
        FillMode::BLACK
    }
}

/// Paint `rects` onto a copy of `image` and return the copy.
///
/// The input is never modified. With no rectangles the result is a
/// pixel-identical clone.
pub fn rasterize(image: &DynamicImage, rects: &[RedactionRect], fill: FillMode) -> DynamicImage {
    let mut out = image.clone();
    let mut painted = 0usize;
    for rect in rects {
        if paint(&mut out, rect, fill) {
            painted += 1;
        }
    }
    debug!(
        "Painted {}/{} rectangles on {}x{} raster",
        painted,
        rects.len(),
        out.width(),
        out.height()
    );
    out
}

/// Paint one rectangle in place. Returns `false` for no-ops (degenerate or
/// off-canvas rectangles).
pub fn paint(image: &mut DynamicImage, rect: &RedactionRect, fill: FillMode) -> bool {
    let (w, h) = image.dimensions();
    // Rects can be built by hand; clip again rather than trust the caller.
    if rect.is_degenerate() || rect.x1 >= w || rect.y1 >= h {
        return false;
    }
    let x2 = rect.x2.min(w - 1);
    let y2 = rect.y2.min(h - 1);
    let (rw, rh) = (x2 - rect.x1 + 1, y2 - rect.y1 + 1);

    match fill {
        FillMode::Solid { colour: [r, g, b] } => {
            let area = Rect::at(rect.x1 as i32, rect.y1 as i32).of_size(rw, rh);
            draw_filled_rect_mut(image, area, Rgba([r, g, b, 255]));
        }
        FillMode::Blur { sigma } => {
            let blurred = image.crop_imm(rect.x1, rect.y1, rw, rh).blur(sigma);
            image::imageops::replace(image, &blurred, rect.x1 as i64, rect.y1 as i64);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 200])
        }))
    }

    #[test]
    fn empty_rect_list_is_pixel_identical() {
        let img = gradient(64, 48);
        let out = rasterize(&img, &[], FillMode::BLACK);
        assert_eq!(out.as_bytes(), img.as_bytes());
        assert_eq!(out.color(), img.color());
    }

    #[test]
    fn solid_fill_paints_inclusive_rect_only() {
        let img = gradient(64, 48);
        let out = rasterize(&img, &[RedactionRect::new(10, 10, 20, 15)], FillMode::BLACK).to_rgb8();
        assert_eq!(out.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(20, 15), &Rgb([0, 0, 0]));
        assert_ne!(out.get_pixel(21, 15), &Rgb([0, 0, 0]));
        assert_ne!(out.get_pixel(9, 10), &Rgb([0, 0, 0]));
        assert_ne!(out.get_pixel(10, 16), &Rgb([0, 0, 0]));
    }

    #[test]
    fn input_is_not_mutated() {
        let img = gradient(32, 32);
        let before = img.as_bytes().to_vec();
        let _ = rasterize(&img, &[RedactionRect::new(0, 0, 31, 31)], FillMode::BLACK);
        assert_eq!(img.as_bytes(), &before[..]);
    }

    #[test]
    fn painting_twice_equals_painting_once() {
        let img = gradient(40, 40);
        let r = RedactionRect::new(5, 5, 30, 12);
        let once = rasterize(&img, &[r], FillMode::BLACK);
        let twice = rasterize(&img, &[r, r], FillMode::BLACK);
        assert_eq!(once.as_bytes(), twice.as_bytes());
    }

    #[test]
    fn degenerate_and_off_canvas_rects_are_no_ops() {
        let img = gradient(16, 16);
        let rects = [
            RedactionRect::collapsed(15, 3, 15, 9),
            RedactionRect::new(9, 3, 3, 3),
            RedactionRect::new(100, 100, 200, 200),
        ];
        let out = rasterize(&img, &rects, FillMode::BLACK);
        assert_eq!(out.as_bytes(), img.as_bytes());
    }

    #[test]
    fn single_pixel_edge_column_is_painted() {
        let img = gradient(16, 16);
        let out = rasterize(&img, &[RedactionRect::new(15, 3, 15, 9)], FillMode::BLACK).to_rgb8();
        assert_eq!(out.get_pixel(15, 3), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(15, 9), &Rgb([0, 0, 0]));
        assert_ne!(out.get_pixel(14, 5), &Rgb([0, 0, 0]));
    }

    #[test]
    fn oversized_rect_is_clipped() {
        let img = gradient(16, 16);
        let out = rasterize(&img, &[RedactionRect::new(8, 8, 500, 500)], FillMode::WHITE).to_rgb8();
        assert_eq!(out.get_pixel(15, 15), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(8, 8), &Rgb([255, 255, 255]));
    }

    #[test]
    fn channel_layout_is_preserved() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(8, 8, image::Luma([200])));
        let out = rasterize(&gray, &[RedactionRect::new(1, 1, 4, 4)], FillMode::BLACK);
        assert_eq!(out.color(), gray.color());
        assert_eq!(out.to_luma8().get_pixel(2, 2).0, [0]);

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            8,
            8,
            Rgba([10, 20, 30, 0]),
        ));
        let out = rasterize(&rgba, &[RedactionRect::new(0, 0, 3, 3)], FillMode::BLACK);
        assert_eq!(out.to_rgba8().get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn blur_changes_only_the_region() {
        let img = gradient(40, 40);
        let r = RedactionRect::new(10, 10, 25, 25);
        let out = rasterize(&img, &[r], FillMode::Blur { sigma: 4.0 }).to_rgb8();
        let src = img.to_rgb8();
        assert_eq!(out.get_pixel(0, 0), src.get_pixel(0, 0));
        assert_eq!(out.get_pixel(39, 39), src.get_pixel(39, 39));
        let changed = (10..=25)
            .flat_map(|x| (10..=25).map(move |y| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y) != src.get_pixel(x, y))
            .count();
        assert!(changed > 0, "blur should alter the region");
    }
}
