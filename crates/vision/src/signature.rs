//! Signature regions
//!
//! Signatures are looked for only under OCR lines that mention signing. The
//! area below such a line is searched for wide, stroke-like edge blobs.

use deid_core::{BBox, Finding, Label, OcrLine};
use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;

pub const SIGNATURE_HINTS: &[&str] = &["signature", "sign", "signee"];

/// Equivalent to a 5x5 Gaussian kernel with derived sigma.
const BLUR_SIGMA: f32 = 1.1;
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

const MIN_AREA: f64 = 500.0;
const MAX_AREA: f64 = 60000.0;
const MIN_ASPECT: f64 = 2.5;

/// Search region below a hint line, as multiples of the line box.
const DEPTH_FACTOR: f64 = 3.0;
const SIDE_PAD_FACTOR: f64 = 0.2;

/// Edge map of the page: blur, Canny, one step of 3x3 dilation.
pub fn edge_map(image: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
    dilate(&edges, Norm::LInf, 1)
}

fn is_hint_line(line: &OcrLine) -> bool {
    let text = line.text.to_lowercase();
    SIGNATURE_HINTS.iter().any(|k| text.contains(k))
}

/// Page rectangle `(x0, y0, x1, y1)` searched under `line`, or `None` when
/// it falls outside the page.
fn search_region(line: &BBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let (x, y, w, h) = (
        line.x as i64,
        line.y as i64,
        line.width as i64,
        line.height as i64,
    );
    let pad = (SIDE_PAD_FACTOR * w as f64) as i64;

    let x0 = (x - pad).clamp(0, width as i64);
    let x1 = (x + w + pad).clamp(0, width as i64);
    let y0 = y.clamp(0, height as i64);
    let y1 = (y + h + (DEPTH_FACTOR * h as f64) as i64).clamp(0, height as i64);

    (x1 > x0 && y1 > y0).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Twice-signed shoelace area, halved and made positive.
fn polygon_area(points: &[imageproc::point::Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        acc += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    acc.abs() as f64 / 2.0
}

/// `SIGNATURE` regions below every line that mentions signing.
pub fn find_signature_regions(image: &RgbImage, lines: &[OcrLine]) -> Vec<Finding> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let hints: Vec<&OcrLine> = lines.iter().filter(|l| is_hint_line(l)).collect();
    if hints.is_empty() {
        return Vec::new();
    }

    let edges = edge_map(image);
    let mut regions = Vec::new();

    for line in hints {
        let Some((x0, y0, x1, y1)) = search_region(&line.bbox, width, height) else {
            continue;
        };

        let roi = image::imageops::crop_imm(&edges, x0, y0, x1 - x0, y1 - y0).to_image();

        for contour in find_contours::<i32>(&roi) {
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }

            let area = polygon_area(&contour.points);
            if area <= MIN_AREA || area >= MAX_AREA {
                continue;
            }

            let Some(rect) = BBox::from_points(contour.points.iter().map(|p| (p.x, p.y))) else {
                continue;
            };
            // Pixel extents are inclusive.
            let (rw, rh) = (rect.width + 1, rect.height + 1);
            let aspect = rw as f64 / rh.max(1) as f64;
            if aspect <= MIN_ASPECT {
                continue;
            }

            regions.push(Finding::region(
                Label::Signature,
                BBox::new(x0 as i32 + rect.x, y0 as i32 + rect.y, rw, rh),
            ));
        }
    }

    log::debug!("[Vision] {} signature regions", regions.len());
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn page_with_stroke() -> RgbImage {
        let mut page = RgbImage::from_pixel(800, 400, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut page, Rect::at(120, 160).of_size(180, 20), Rgb([0, 0, 0]));
        page
    }

    #[test]
    fn test_finds_stroke_under_hint_line() {
        let page = page_with_stroke();
        let lines = vec![OcrLine::new("Signature:", BBox::new(100, 100, 200, 30), 0.9)];

        let found = find_signature_regions(&page, &lines);
        assert_eq!(found.len(), 1);
        let b = found[0].bbox();
        assert_eq!(found[0].label(), Label::Signature);
        assert!(b.x <= 120 && b.right() >= 300, "{:?}", b);
        assert!(b.y <= 160 && b.bottom() >= 180, "{:?}", b);
        assert!(b.width < 200 && b.height < 40, "{:?}", b);
    }

    #[test]
    fn test_no_hint_no_search() {
        let page = page_with_stroke();
        let lines = vec![OcrLine::new("Total due", BBox::new(100, 100, 200, 30), 0.9)];
        assert!(find_signature_regions(&page, &lines).is_empty());
    }

    #[test]
    fn test_square_blob_rejected() {
        let mut page = RgbImage::from_pixel(800, 400, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut page, Rect::at(150, 140).of_size(60, 60), Rgb([0, 0, 0]));
        let lines = vec![OcrLine::new("sign here", BBox::new(100, 100, 200, 30), 0.9)];
        assert!(find_signature_regions(&page, &lines).is_empty());
    }

    #[test]
    fn test_empty_image() {
        let lines = vec![OcrLine::new("Signature", BBox::new(0, 0, 10, 10), 0.9)];
        assert!(find_signature_regions(&RgbImage::new(0, 0), &lines).is_empty());
    }

    #[test]
    fn test_search_region_clamped() {
        assert_eq!(
            search_region(&BBox::new(-10, 90, 100, 10), 120, 100),
            Some((0, 90, 110, 100))
        );
        assert_eq!(search_region(&BBox::new(500, 10, 10, 10), 100, 100), None);
    }

    #[test]
    fn test_polygon_area() {
        use imageproc::point::Point;
        let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        assert_eq!(polygon_area(&square), 100.0);
    }
}
