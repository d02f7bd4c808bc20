//! Error types shared across the workspace.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid finding: {0}")]
    InvalidFinding(String),
    #[error("unknown redaction mode: {0}")]
    InvalidMode(String),
    #[error("invalid lexicon: {0}")]
    InvalidLexicon(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An optional capability (OCR engine, entity model, face cascade) that could
/// not be brought up.
///
/// Callers log it once and carry on with the capability disabled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{capability} unavailable: {reason}")]
pub struct Unavailable {
    pub capability: Capability,
    pub reason: String,
}

impl Unavailable {
    pub fn new(capability: Capability, reason: impl Into<String>) -> Self {
        Self {
            capability,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Ocr,
    EntityModel,
    FaceDetector,
    PdfRenderer,
    Font,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Ocr => "ocr engine",
            Capability::EntityModel => "entity model",
            Capability::FaceDetector => "face detector",
            Capability::PdfRenderer => "pdf renderer",
            Capability::Font => "font",
        };
        f.write_str(name)
    }
}
