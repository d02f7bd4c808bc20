//! OCR shared types

use serde::{Deserialize, Serialize};

/// How recognized words are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Words sharing a Tesseract line id are merged into one line.
    #[default]
    Line,
    /// Every word is its own line.
    Word,
}

/// Tesseract configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Tesseract executable; `tesseract` on PATH when unset
    pub binary_path: Option<String>,
    /// Exported as TESSDATA_PREFIX when set
    pub tessdata_path: Option<String>,
    /// Language pack, e.g. "eng" or "eng+hin"
    pub lang: String,
    /// Page segmentation mode (0-13)
    pub psm: u8,
    /// OCR engine mode (0-3)
    pub oem: u8,
    /// Words below this confidence (0-100) are dropped
    pub min_confidence: f32,
    pub granularity: Granularity,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            tessdata_path: None,
            lang: "eng".to_string(),
            psm: 3,
            oem: 1,
            min_confidence: 30.0,
            granularity: Granularity::Line,
        }
    }
}

impl TesseractConfig {
    pub fn binary(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }
}

/// OCR audit information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrAuditInfo {
    pub engine: String,
    pub engine_version: Option<String>,
    /// Engine parameters (JSON)
    pub engine_params: Option<String>,
    /// Fingerprint of the installed traineddata files
    pub tessdata_hash: Option<String>,
}
