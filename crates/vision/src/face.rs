//! Frontal face detection on a SeetaFace cascade (rustface).

use deid_core::{BBox, Capability, Finding, Label, Unavailable};
use image::RgbImage;
use rustface::{Detector, ImageData};
use std::path::Path;
use std::sync::Mutex;

/// Faces smaller than this (in pixels) are ignored.
pub const MIN_FACE_SIZE: u32 = 40;
/// Pyramid step between scales, the inverse of a 1.1 scale factor.
pub const PYRAMID_SCALE: f32 = 1.0 / 1.1;
pub const SCORE_THRESHOLD: f64 = 2.0;
const SLIDE_STEP: u32 = 4;

pub struct FaceDetector {
    // The cascade needs `&mut` to run, the pipeline only hands out `&`.
    inner: Mutex<Box<dyn Detector>>,
}

impl FaceDetector {
    /// Loads the cascade model from `model_path`.
    pub fn load(model_path: &Path) -> Result<Self, Unavailable> {
        if !model_path.is_file() {
            return Err(Unavailable::new(
                Capability::FaceDetector,
                format!("model not found: {}", model_path.display()),
            ));
        }

        let path = model_path.to_string_lossy();
        let mut detector = rustface::create_detector(&path)
            .map_err(|e| Unavailable::new(Capability::FaceDetector, e.to_string()))?;

        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE);
        detector.set_slide_window_step(SLIDE_STEP, SLIDE_STEP);

        log::info!("[Vision] face model loaded from {}", model_path.display());
        Ok(Self {
            inner: Mutex::new(detector),
        })
    }

    /// One `FACE` region per detected face.
    pub fn detect(&self, image: &RgbImage) -> Vec<Finding> {
        if image.width() == 0 || image.height() == 0 {
            return Vec::new();
        }

        let gray = image::imageops::grayscale(image);
        let mut data = ImageData::new(gray.as_raw(), gray.width(), gray.height());

        let faces = match self.inner.lock() {
            Ok(mut detector) => detector.detect(&mut data),
            Err(e) => {
                log::warn!("[Vision] face detector poisoned: {}", e);
                return Vec::new();
            }
        };

        faces
            .iter()
            .map(|face| {
                let r = face.bbox();
                let bbox = BBox::new(r.x(), r.y(), r.width() as i32, r.height() as i32);
                Finding::region(Label::Face, bbox)
            })
            .collect()
    }
}
