//! Application configuration
//!
//! Stored as camelCase JSON. Missing keys fall back to defaults, so older
//! config files keep loading. A few settings can be overridden from the
//! environment (`DEID_*`), and the CLI overrides both.

use deid_core::RedactionMode;
use deid_ocr::TesseractConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_FACE_MODEL: &str = "models/seeta_fd_frontal_v1.0.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeidConfig {
    // ============ Redaction ============
    pub mode: RedactionMode,
    /// Redact every finding without asking
    pub auto_redact: bool,

    // ============ Detectors ============
    pub enable_ner: bool,
    pub enable_faces: bool,
    pub enable_signatures: bool,
    /// SeetaFace cascade model
    pub face_model_path: String,
    /// Entity lexicon; the built-in one when unset
    pub entity_lexicon_path: Option<String>,

    // ============ Ingestion ============
    /// Smaller page images, faster OCR
    pub fast_mode: bool,
    pub pdf_dpi: u32,
    pub pdf_max_px: u32,
    /// Font for rendering DOCX/XLSX/text pages; DejaVu Sans is searched when unset
    pub font_path: Option<String>,

    // ============ Output ============
    pub output_dir: String,

    // ============ OCR ============
    pub tesseract: TesseractConfig,
}

impl Default for DeidConfig {
    fn default() -> Self {
        Self {
            mode: RedactionMode::Blur,
            auto_redact: true,
            enable_ner: true,
            enable_faces: true,
            enable_signatures: true,
            face_model_path: DEFAULT_FACE_MODEL.to_string(),
            entity_lexicon_path: None,
            fast_mode: true,
            pdf_dpi: deid_pdf::DEFAULT_DPI,
            pdf_max_px: deid_pdf::DEFAULT_MAX_PX,
            font_path: None,
            output_dir: "outputs".to_string(),
            tesseract: TesseractConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads the config at `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<DeidConfig, ConfigError> {
    if !path.exists() {
        log::debug!("[Config] {} not found, using defaults", path.display());
        return Ok(DeidConfig::default());
    }
    let raw = fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw)?;
    log::info!("[Config] loaded {}", path.display());
    Ok(config)
}

pub fn save_config(path: &Path, config: &DeidConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

// ============ Environment overrides ============

fn env_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("[Config] ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

/// Applies `DEID_PDF_DPI`, `DEID_OCR_MIN_CONF`, `DEID_OUTPUT_DIR` and
/// `DEID_MODE` from the process environment.
pub fn apply_env_overrides(config: &mut DeidConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with a custom variable source.
pub fn apply_overrides_from(config: &mut DeidConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dpi) = env_parse::<u32>(&lookup, "DEID_PDF_DPI").filter(|v| *v > 0) {
        config.pdf_dpi = dpi;
    }
    if let Some(conf) = env_parse::<f32>(&lookup, "DEID_OCR_MIN_CONF") {
        config.tesseract.min_confidence = conf;
    }
    if let Some(dir) = lookup("DEID_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
        config.output_dir = dir;
    }
    if let Some(mode) = env_parse::<RedactionMode>(&lookup, "DEID_MODE") {
        config.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let cfg = DeidConfig::default();
        assert_eq!(cfg.mode, RedactionMode::Blur);
        assert_eq!(cfg.pdf_dpi, 170);
        assert_eq!(cfg.pdf_max_px, 1800);
        assert_eq!(cfg.output_dir, "outputs");
        assert_eq!(cfg.tesseract.min_confidence, 30.0);
        assert!(cfg.enable_ner && cfg.enable_faces && cfg.enable_signatures);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: DeidConfig =
            serde_json::from_str(r#"{"mode":"fill","pdfDpi":200,"tesseract":{"psm":6}}"#).unwrap();
        assert_eq!(cfg.mode, RedactionMode::Black);
        assert_eq!(cfg.pdf_dpi, 200);
        assert_eq!(cfg.tesseract.psm, 6);
        assert_eq!(cfg.tesseract.lang, "eng");
        assert!(cfg.auto_redact);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("deid_cfg_{}", std::process::id()))
            .join("config.json");
        let mut cfg = DeidConfig::default();
        cfg.enable_faces = false;
        cfg.font_path = Some("/fonts/x.ttf".into());

        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = load_config(Path::new("/nonexistent/deid.json")).unwrap();
        assert_eq!(cfg, DeidConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DEID_PDF_DPI", "300"),
            ("DEID_OCR_MIN_CONF", "55.5"),
            ("DEID_OUTPUT_DIR", "/tmp/out"),
            ("DEID_MODE", "black"),
        ]
        .into_iter()
        .collect();

        let mut cfg = DeidConfig::default();
        apply_overrides_from(&mut cfg, |k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.pdf_dpi, 300);
        assert_eq!(cfg.tesseract.min_confidence, 55.5);
        assert_eq!(cfg.output_dir, "/tmp/out");
        assert_eq!(cfg.mode, RedactionMode::Black);
    }

    #[test]
    fn test_bad_env_values_ignored() {
        let mut cfg = DeidConfig::default();
        apply_overrides_from(&mut cfg, |k| match k {
            "DEID_PDF_DPI" => Some("lots".into()),
            "DEID_MODE" => Some("pixelate".into()),
            _ => None,
        });
        assert_eq!(cfg, DeidConfig::default());
    }
}
