//! Pixel-level detectors: faces, signature strokes and QR codes.
//!
//! Every detector accepts an empty image and returns no findings for it.

pub mod face;
pub mod qr;
pub mod signature;

pub use face::FaceDetector;
pub use qr::detect_qr_regions;
pub use signature::find_signature_regions;
