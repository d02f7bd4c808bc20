//! Redaction applier
//!
//! Obscures located findings on a page image. Each box grows by 3% of its
//! size on every side and is clamped to the page. Boxes that end up empty,
//! including the unlocated sentinel, are skipped.

use deid_core::{BBox, Finding, RedactionMode};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::rect::Rect;

/// Growth of a box per side, as a fraction of its width/height.
pub const PAD_FRACTION: f64 = 0.03;
/// Smallest blur kernel, in pixels.
pub const MIN_KERNEL: u32 = 15;

const FILL: Rgb<u8> = Rgb([0, 0, 0]);

/// Page rectangle covered by `bbox` after padding and clamping, as
/// `(x0, y0, x1, y1)` with exclusive ends. `None` when nothing is left.
pub fn expand_and_clamp(bbox: &BBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if !bbox.is_located() {
        return None;
    }

    let (x, y, w, h) = (
        bbox.x as i64,
        bbox.y as i64,
        bbox.width as i64,
        bbox.height as i64,
    );
    let pad_x = (PAD_FRACTION * w as f64) as i64;
    let pad_y = (PAD_FRACTION * h as f64) as i64;

    let x0 = (x - pad_x).clamp(0, width as i64);
    let y0 = (y - pad_y).clamp(0, height as i64);
    let x1 = (x + w + pad_x).clamp(0, width as i64);
    let y1 = (y + h + pad_y).clamp(0, height as i64);

    (x1 > x0 && y1 > y0).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Odd blur kernel for a region `region_width` pixels wide: a tenth of the
/// width, rounded up to odd, never below [`MIN_KERNEL`].
pub fn blur_kernel_size(region_width: u32) -> u32 {
    let tenth = (region_width / 10).max(1);
    ((tenth / 2) * 2 + 1).max(MIN_KERNEL)
}

/// Gaussian sigma matching a `k`x`k` kernel.
pub fn kernel_sigma(k: u32) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Applies `mode` to every box in place. Returns how many boxes touched the
/// image.
pub fn apply_redactions<'a, I>(image: &mut RgbImage, boxes: I, mode: RedactionMode) -> usize
where
    I: IntoIterator<Item = &'a BBox>,
{
    let (width, height) = image.dimensions();
    let mut applied = 0;

    for bbox in boxes {
        let Some((x0, y0, x1, y1)) = expand_and_clamp(bbox, width, height) else {
            continue;
        };
        let (rw, rh) = (x1 - x0, y1 - y0);

        match mode {
            RedactionMode::Black => {
                draw_filled_rect_mut(image, Rect::at(x0 as i32, y0 as i32).of_size(rw, rh), FILL);
            }
            RedactionMode::Blur => {
                let region = image::imageops::crop_imm(image, x0, y0, rw, rh).to_image();
                let sigma = kernel_sigma(blur_kernel_size(rw));
                let blurred = gaussian_blur_f32(&region, sigma);
                image::imageops::replace(image, &blurred, x0 as i64, y0 as i64);
            }
        }
        applied += 1;
    }

    applied
}

/// Redacted copy of `image` with every selected finding obscured.
pub fn redact(image: &RgbImage, selected: &[Finding], mode: RedactionMode) -> RgbImage {
    let mut out = image.clone();
    let boxes: Vec<BBox> = selected.iter().map(Finding::bbox).collect();
    let applied = apply_redactions(&mut out, &boxes, mode);
    log::debug!(
        "[Redact] {} of {} regions redacted ({})",
        applied,
        selected.len(),
        mode
    );
    out
}
