//! OCR engine trait

use deid_core::OcrLine;
use image::RgbImage;

use crate::error::OcrError;
use crate::types::OcrAuditInfo;

/// Unified OCR engine trait.
///
/// Boxes are in pixel coordinates of the image passed in.
pub trait OcrEngine: Send + Sync {
    /// Recognizes text lines in `image`, in detection order.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, OcrError>;

    fn audit_info(&self) -> OcrAuditInfo;
}
