//! Detect / redact pipeline
//!
//! Pages are handled one at a time: OCR, text and visual detection,
//! selection, redaction, then one log entry per page. A file that cannot be
//! read is skipped and recorded; it never stops the batch.

use deid_core::{
    align_findings, extract_entities, extract_text_findings, full_text, Finding, OcrLine,
    PageImage, RedactionLogEntry, RedactionMode,
};
use deid_redact::redact;
use deid_vision::{detect_qr_regions, find_signature_regions};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::DeidConfig;
use crate::ingest::{load_pages, IngestOptions};
use crate::select::FindingSelector;
use crate::services::Services;

/// Which optional detectors run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    pub entities: bool,
    pub faces: bool,
    pub signatures: bool,
    pub qr_codes: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            entities: true,
            faces: true,
            signatures: true,
            qr_codes: true,
        }
    }
}

impl From<&DeidConfig> for DetectOptions {
    fn from(config: &DeidConfig) -> Self {
        Self {
            entities: config.enable_ner,
            faces: config.enable_faces,
            signatures: config.enable_signatures,
            qr_codes: true,
        }
    }
}

/// An input file that produced no pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    pub file: String,
    pub reason: String,
}

/// Everything a batch run produced, in processing order.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub pages: Vec<RgbImage>,
    pub entries: Vec<RedactionLogEntry>,
    pub skipped: Vec<SkippedUnit>,
}

/// OCR lines for `image`; empty when OCR is off or fails.
pub fn recognize_lines(services: &Services, image: &RgbImage) -> Vec<OcrLine> {
    let Some(engine) = services.ocr() else {
        return Vec::new();
    };
    match engine.recognize(image) {
        Ok(lines) => lines,
        Err(e) => {
            log::warn!("[Pipeline] OCR failed: {}", e);
            Vec::new()
        }
    }
}

/// All findings for one page: text patterns, entities, faces, signatures,
/// QR codes, in that order.
pub fn detect(
    services: &Services,
    options: &DetectOptions,
    image: &RgbImage,
    lines: &[OcrLine],
    text: &str,
) -> Vec<Finding> {
    let mut findings = align_findings(extract_text_findings(text), lines);

    if options.entities {
        findings.extend(extract_entities(
            services.entity_model(),
            text,
            lines,
            options.entities,
        ));
    }

    if options.faces {
        if let Some(detector) = services.face_detector() {
            findings.extend(detector.detect(image));
        }
    }

    if options.signatures {
        findings.extend(find_signature_regions(image, lines));
    }

    if options.qr_codes {
        findings.extend(detect_qr_regions(image));
    }

    findings
}

/// Detects, selects and redacts one page.
pub fn process_page(
    services: &Services,
    options: &DetectOptions,
    selector: &mut dyn FindingSelector,
    page: &PageImage,
    mode: RedactionMode,
) -> (RgbImage, RedactionLogEntry) {
    let started = Instant::now();

    let lines = recognize_lines(services, &page.pixels);
    let text = full_text(&lines);
    let detections = detect(services, options, &page.pixels, &lines, &text);
    let selected = selector.select(page, &detections);
    let redacted = redact(&page.pixels, &selected, mode);

    log::info!(
        "[Pipeline] {}: {} lines, {} findings, {} selected ({} ms)",
        page.label(),
        lines.len(),
        detections.len(),
        selected.len(),
        started.elapsed().as_millis()
    );

    let entry = RedactionLogEntry::new(
        page.file.clone(),
        page.page_tag.clone(),
        detections,
        selected,
        mode,
    );
    (redacted, entry)
}

fn display_path(path: &Path) -> String {
    deid_core::document::display_name(path)
}

/// Runs every input through the pipeline.
pub fn run_batch(
    services: &Services,
    options: &DetectOptions,
    ingest: &IngestOptions,
    selector: &mut dyn FindingSelector,
    mode: RedactionMode,
    inputs: &[PathBuf],
) -> BatchOutput {
    let mut output = BatchOutput::default();

    for (index, path) in inputs.iter().enumerate() {
        log::info!(
            "[Pipeline] ({}/{}) {}",
            index + 1,
            inputs.len(),
            path.display()
        );

        let pages = match load_pages(path, ingest) {
            Ok(pages) => pages,
            Err(e) => {
                log::warn!("[Pipeline] skipping {}: {:#}", path.display(), e);
                output.skipped.push(SkippedUnit {
                    file: display_path(path),
                    reason: format!("{:#}", e),
                });
                continue;
            }
        };

        for page in &pages {
            let (redacted, entry) = process_page(services, options, selector, page, mode);
            output.pages.push(redacted);
            output.entries.push(entry);
        }
    }

    log::info!(
        "[Pipeline] done: {} pages, {} skipped",
        output.pages.len(),
        output.skipped.len()
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::AutoSelect;
    use deid_core::{BBox, EntityModel, Label, LexiconSource};
    use deid_ocr::{OcrAuditInfo, OcrEngine, OcrError};
    use image::Rgb;

    /// Returns the same lines for every image.
    struct FixedOcr(Vec<OcrLine>);

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<OcrLine>, OcrError> {
            Ok(self.0.clone())
        }

        fn audit_info(&self) -> OcrAuditInfo {
            OcrAuditInfo {
                engine: "fixed".to_string(),
                engine_version: None,
                engine_params: None,
                tessdata_hash: None,
            }
        }
    }

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn contact_services() -> Services {
        let line = OcrLine::new(
            "Contact jane@example.com or call 555-123-4567",
            BBox::new(20, 20, 400, 30),
            0.95,
        );
        Services::with_components(Some(Box::new(FixedOcr(vec![line]))), None, None)
    }

    fn text_only() -> DetectOptions {
        DetectOptions {
            entities: false,
            faces: false,
            signatures: false,
            qr_codes: false,
        }
    }

    fn white_page(name: &str) -> PageImage {
        PageImage::new(name, "", RgbImage::from_pixel(500, 100, WHITE))
    }

    #[test]
    fn test_contact_page_round_trip() {
        let services = contact_services();
        let page = white_page("contact.png");

        let (redacted, entry) =
            process_page(&services, &text_only(), &mut AutoSelect, &page, RedactionMode::Black);

        let labels: Vec<Label> = entry.detections().iter().map(Finding::label).collect();
        assert_eq!(labels, vec![Label::Email, Label::Phone]);
        assert_eq!(entry.redacted(), entry.detections());
        assert_eq!(entry.detections()[0].bbox(), BBox::new(20, 20, 400, 30));
        assert_eq!(entry.file(), "contact.png");
        assert_eq!(entry.mode(), RedactionMode::Black);

        assert_eq!(*redacted.get_pixel(200, 35), BLACK);
        assert_eq!(*redacted.get_pixel(200, 90), WHITE);
        assert_eq!(*redacted.get_pixel(450, 35), WHITE);
    }

    #[test]
    fn test_no_ocr_means_no_text_findings() {
        let services = Services::with_components(None, None, None);
        let page = white_page("blank.png");
        let (redacted, entry) = process_page(
            &services,
            &DetectOptions::default(),
            &mut AutoSelect,
            &page,
            RedactionMode::Blur,
        );
        assert!(entry.detections().is_empty());
        assert_eq!(redacted, page.pixels);
    }

    #[test]
    fn test_entities_follow_text_findings() {
        let lines = vec![
            OcrLine::new("Call 555-123-4567", BBox::new(10, 10, 300, 20), 0.9),
            OcrLine::new("Dr. Jane Doe works at", BBox::new(10, 40, 300, 20), 0.9),
            OcrLine::new("Acme Corp in New York.", BBox::new(10, 70, 300, 20), 0.9),
        ];
        let services = Services::with_components(
            None,
            Some(EntityModel::load(LexiconSource::Builtin).unwrap()),
            None,
        );
        let options = DetectOptions {
            entities: true,
            ..text_only()
        };
        let text = full_text(&lines);
        let found = detect(&services, &options, &RgbImage::new(400, 100), &lines, &text);

        let labels: Vec<Label> = found.iter().map(Finding::label).collect();
        assert_eq!(
            labels,
            vec![Label::Phone, Label::Person, Label::Organization, Label::Location]
        );
        assert_eq!(found[1].matched(), Some("Jane Doe"));
        assert_eq!(found[1].bbox(), lines[1].bbox);

        let no_entities = DetectOptions {
            entities: false,
            ..DetectOptions::default()
        };
        let found = detect(&services, &no_entities, &RgbImage::new(0, 0), &lines, &text);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_batch_skips_unreadable_inputs() {
        let dir = std::env::temp_dir().join(format!("deid_batch_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("page.png");
        RgbImage::from_pixel(300, 80, WHITE).save(&good).unwrap();
        let unsupported = dir.join("slides.pptx");
        std::fs::write(&unsupported, b"x").unwrap();

        let inputs = vec![unsupported, good, dir.join("missing.jpg")];
        let ingest = IngestOptions::from(&DeidConfig::default());
        let out = run_batch(
            &contact_services(),
            &text_only(),
            &ingest,
            &mut AutoSelect,
            RedactionMode::Black,
            &inputs,
        );

        assert_eq!(out.pages.len(), 1);
        assert_eq!(out.entries.len(), 1);
        assert_eq!(out.entries[0].file(), "page.png");
        assert_eq!(out.skipped.len(), 2);
        assert_eq!(out.skipped[0].file, "slides.pptx");
        assert!(out.skipped[0].reason.contains("unsupported"));
        assert_eq!(out.skipped[1].file, "missing.jpg");

        let _ = std::fs::remove_dir_all(dir);
    }
}
