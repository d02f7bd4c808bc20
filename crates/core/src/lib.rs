//! Core model and text-side detection for page de-identification.
//!
//! - `types`: boxes, OCR lines, labels and findings
//! - `rules`: regex catalog and address heuristic
//! - `entities`: lexicon-driven named-entity pass
//! - `align`: placing text hits onto OCR line boxes
//! - `document`: ingestion trait and raster image documents
//! - `audit`: per-page redaction log entries

pub mod align;
pub mod audit;
pub mod document;
pub mod entities;
pub mod error;
pub mod rules;
pub mod types;

pub use align::{align_findings, locate};
pub use audit::RedactionLogEntry;
pub use document::{Document, ImageDocument, PageImage};
pub use entities::{extract_entities, EntityModel, LexiconSource};
pub use error::{Capability, CoreError, Unavailable};
pub use rules::{extract_text_findings, mask_snippet};
pub use types::{BBox, Finding, Label, LabelKind, OcrLine, RedactionMode, TextMatch};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Joins OCR line texts with `\n`, the text every text detector scans.
pub fn full_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
