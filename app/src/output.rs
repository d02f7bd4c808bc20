//! Batch outputs: the redacted PDF and the JSON redaction log.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use deid_core::audit::format_timestamp;
use deid_core::RedactionLogEntry;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

pub const PDF_DIR: &str = "redacted_pdfs";
pub const LOG_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `None` when there were no pages to write.
    pub pdf: Option<PathBuf>,
    pub log: PathBuf,
}

/// Writes `<out>/redacted_pdfs/redacted_<ts>.pdf` and
/// `<out>/logs/redaction_log_<ts>.json`.
pub fn write_outputs(
    output_dir: &Path,
    pages: &[RgbImage],
    entries: &[RedactionLogEntry],
    at: DateTime<Local>,
) -> Result<OutputPaths> {
    let stamp = format_timestamp(at);

    let pdf = if pages.is_empty() {
        log::warn!("[Pipeline] no pages processed, skipping PDF");
        None
    } else {
        let path = output_dir
            .join(PDF_DIR)
            .join(format!("redacted_{}.pdf", stamp));
        deid_pdf::export_images_to_pdf(pages, &path)?;
        Some(path)
    };

    let log_dir = output_dir.join(LOG_DIR);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join(format!("redaction_log_{}.json", stamp));
    let json = serde_json::to_string_pretty(entries).context("failed to serialize log")?;
    fs::write(&log_path, json)
        .with_context(|| format!("failed to write {}", log_path.display()))?;

    log::info!("[Pipeline] log written to {}", log_path.display());
    Ok(OutputPaths { pdf, log: log_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use deid_core::{BBox, Finding, Label, RedactionMode};

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_writes_pdf_and_log() {
        let dir = std::env::temp_dir().join(format!("deid_out_{}", std::process::id()));
        let finding = Finding::text(Label::Email, "jane@example.com", BBox::new(1, 2, 3, 4));
        let entry = RedactionLogEntry::at(
            "a.png",
            "",
            vec![finding.clone()],
            vec![finding],
            RedactionMode::Blur,
            fixed_time(),
        );
        let pages = vec![RgbImage::new(40, 30)];

        let paths = write_outputs(&dir, &pages, &[entry], fixed_time()).unwrap();
        let pdf = paths.pdf.unwrap();
        assert_eq!(pdf, dir.join("redacted_pdfs/redacted_20240305T140709.pdf"));
        assert!(pdf.is_file());
        assert_eq!(paths.log, dir.join("logs/redaction_log_20240305T140709.json"));

        let raw = fs::read_to_string(&paths.log).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["file"], "a.png");
        assert_eq!(json[0]["mode"], "blur");
        assert_eq!(json[0]["detections"][0]["label"], "EMAIL");
        assert_eq!(json[0]["detections"][0]["box"], serde_json::json!([1, 2, 3, 4]));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_no_pages_still_logs() {
        let dir = std::env::temp_dir().join(format!("deid_out_empty_{}", std::process::id()));
        let paths = write_outputs(&dir, &[], &[], fixed_time()).unwrap();
        assert!(paths.pdf.is_none());
        assert_eq!(fs::read_to_string(&paths.log).unwrap(), "[]");
        let _ = fs::remove_dir_all(dir);
    }
}
