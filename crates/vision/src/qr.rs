//! QR code detection and decoding (rqrr).

use deid_core::{BBox, Finding};
use image::RgbImage;

/// One `QRCODE` symbol per decodable grid, with its payload.
///
/// Payload bytes are decoded as lossy UTF-8. Grids that fail to decode are
/// skipped.
pub fn detect_qr_regions(image: &RgbImage) -> Vec<Finding> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let gray = image::imageops::grayscale(image);
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            gray.get_pixel(x as u32, y as u32)[0]
        });

    let mut found = Vec::new();
    for grid in prepared.detect_grids() {
        let mut payload = Vec::new();
        if let Err(e) = grid.decode_to(&mut payload) {
            log::debug!("[Vision] QR grid not decodable: {}", e);
            continue;
        }

        let Some(bounds) = BBox::from_points(grid.bounds.iter().map(|p| (p.x, p.y))) else {
            continue;
        };

        found.push(Finding::qr_code(
            String::from_utf8_lossy(&payload).into_owned(),
            bounds,
        ));
    }

    log::debug!("[Vision] {} QR codes", found.len());
    found
}
