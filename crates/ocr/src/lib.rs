//! OCR collaborator
//!
//! The pipeline only needs text lines with pixel boxes. `OcrEngine` is that
//! seam; `TesseractEngine` fills it by driving the `tesseract` CLI and
//! parsing its TSV output.

mod engine;
mod error;
mod tesseract;
mod types;

pub use engine::OcrEngine;
pub use error::OcrError;
pub use tesseract::{compute_tessdata_hash, get_tesseract_version, parse_tesseract_tsv, TesseractEngine};
pub use types::{Granularity, OcrAuditInfo, TesseractConfig};
