//! Tesseract OCR engine (CLI wrapper)

use deid_core::{BBox, OcrLine};
use image::RgbImage;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::engine::OcrEngine;
use crate::error::OcrError;
use crate::types::{Granularity, OcrAuditInfo, TesseractConfig};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Tesseract OCR engine
pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
}

impl TesseractEngine {
    /// Creates the engine, checking that the binary runs.
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let version = get_tesseract_version(config.binary())?;

        log::info!("[OCR] tesseract ready, version {}", version);

        Ok(Self { config, version })
    }

    fn run_tsv(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut cmd = Command::new(self.config.binary());

        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.lang)
            .arg("--psm")
            .arg(self.config.psm.to_string())
            .arg("--oem")
            .arg(self.config.oem.to_string())
            .arg("tsv");

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::debug!(
            "[OCR] run: {} {} -l {} --psm {} --oem {} tsv",
            self.config.binary(),
            image_path.display(),
            self.config.lang,
            self.config.psm,
            self.config.oem
        );

        let output = cmd
            .output()
            .map_err(|e| OcrError::Launch(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();

        let temp_input = std::env::temp_dir().join(format!(
            "deid_ocr_{}_{}.png",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        image
            .save(&temp_input)
            .map_err(|e| OcrError::ImageProcess(format!("failed to write temp image: {}", e)))?;

        let tsv = self.run_tsv(&temp_input);

        if let Err(e) = std::fs::remove_file(&temp_input) {
            log::warn!("[OCR] failed to remove temp file: {}", e);
        }

        let lines = parse_tesseract_tsv(&tsv?, self.config.min_confidence, self.config.granularity);

        log::info!(
            "[OCR] recognized {} lines in {} ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(lines)
    }

    fn audit_info(&self) -> OcrAuditInfo {
        let params = serde_json::json!({
            "lang": self.config.lang,
            "psm": self.config.psm,
            "oem": self.config.oem,
            "minConfidence": self.config.min_confidence,
        });

        OcrAuditInfo {
            engine: "tesseract".to_string(),
            engine_version: Some(self.version.clone()),
            engine_params: Some(params.to_string()),
            tessdata_hash: self
                .config
                .tessdata_path
                .as_ref()
                .and_then(|p| compute_tessdata_hash(Path::new(p)).ok()),
        }
    }
}

/// One word row of Tesseract's TSV output.
struct TsvWord<'a> {
    key: (u32, u32, u32, u32),
    bbox: BBox,
    conf: f32,
    text: &'a str,
}

fn parse_word_row(row: &str) -> Option<TsvWord<'_>> {
    let cols: Vec<&str> = row.split('\t').collect();
    if cols.len() < 12 {
        return None;
    }

    let level: i32 = cols[0].trim().parse().ok()?;
    if level != 5 {
        return None;
    }

    let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
    let px = |i: usize| cols[i].trim().parse::<i32>().unwrap_or(0);

    Some(TsvWord {
        key: (num(1), num(2), num(3), num(4)),
        bbox: BBox::new(px(6), px(7), px(8), px(9)),
        conf: cols[10].trim().parse().unwrap_or(-1.0),
        text: cols[11].trim(),
    })
}

/// Parses Tesseract TSV output.
///
/// Columns:
/// level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
///
/// Only word rows (level 5) with text and a confidence of at least
/// `min_confidence` are kept; confidence is scaled to `[0, 1]`. With
/// [`Granularity::Line`] words are merged per (page, block, paragraph, line)
/// into one line with the union box, space-joined text and mean confidence.
pub fn parse_tesseract_tsv(tsv: &str, min_confidence: f32, granularity: Granularity) -> Vec<OcrLine> {
    let words = tsv
        .lines()
        .skip(1)
        .filter_map(parse_word_row)
        .filter(|w| !w.text.is_empty() && w.conf >= 0.0 && w.conf >= min_confidence);

    match granularity {
        Granularity::Word => words
            .map(|w| OcrLine::new(w.text, w.bbox, w.conf / 100.0))
            .collect(),
        Granularity::Line => {
            struct Group {
                texts: Vec<String>,
                bbox: BBox,
                conf_sum: f32,
            }

            let mut order: Vec<Group> = Vec::new();
            let mut index: HashMap<(u32, u32, u32, u32), usize> = HashMap::new();

            for w in words {
                match index.get(&w.key) {
                    Some(&i) => {
                        let g = &mut order[i];
                        g.texts.push(w.text.to_string());
                        g.bbox = g.bbox.union(&w.bbox);
                        g.conf_sum += w.conf;
                    }
                    None => {
                        index.insert(w.key, order.len());
                        order.push(Group {
                            texts: vec![w.text.to_string()],
                            bbox: w.bbox,
                            conf_sum: w.conf,
                        });
                    }
                }
            }

            order
                .into_iter()
                .map(|g| {
                    let mean = g.conf_sum / g.texts.len() as f32;
                    OcrLine::new(g.texts.join(" "), g.bbox, mean / 100.0)
                })
                .collect()
        }
    }
}

/// Reads the Tesseract version.
pub fn get_tesseract_version(binary_path: &str) -> Result<String, OcrError> {
    let output = Command::new(binary_path)
        .arg("--version")
        .output()
        .map_err(|e| OcrError::Launch(e.to_string()))?;

    if !output.status.success() {
        return Err(OcrError::Failed("tesseract --version failed".to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_version(&format!("{}{}", stdout, stderr)))
}

/// First `tesseract X.Y.Z` (or `vX.Y.Z`) line of the banner.
fn parse_version(banner: &str) -> String {
    banner
        .lines()
        .filter(|line| line.contains("tesseract"))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|v| v.trim_start_matches('v').to_string())
        .next()
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fingerprints a tessdata directory by the names and sizes of its
/// `.traineddata` files.
pub fn compute_tessdata_hash(tessdata_path: &Path) -> Result<String, OcrError> {
    let mut entries: Vec<(String, u64)> = std::fs::read_dir(tessdata_path)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "traineddata")
                .unwrap_or(false)
        })
        .map(|e| {
            let size = e.metadata().map(|m| m.len()).unwrap_or(0);
            (e.file_name().to_string_lossy().into_owned(), size)
        })
        .collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (name, size) in &entries {
        hasher.update(name.as_bytes());
        hasher.update(size.to_le_bytes());
    }

    Ok(hex::encode(hasher.finalize()))
}
