//! Unified document interface
//!
//! Every ingestion backend implements `Document`, so the pipeline sees one
//! shape no matter the source format: a list of RGB page images.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

/// Extensions handled by [`ImageDocument`].
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Longest side for images in fast mode.
pub const FAST_MAX_SIDE: u32 = 1600;
/// Longest side for images at full quality.
pub const FULL_MAX_SIDE: u32 = 2800;

/// One unit of imagery handed to the pipeline.
///
/// For paged sources `page_tag` names the page (`(p3)`, `Sheet1`); for plain
/// images it is empty.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Display name of the source file.
    pub file: String,
    pub page_tag: String,
    pub pixels: RgbImage,
}

impl PageImage {
    pub fn new(file: impl Into<String>, page_tag: impl Into<String>, pixels: RgbImage) -> Self {
        Self {
            file: file.into(),
            page_tag: page_tag.into(),
            pixels,
        }
    }

    /// `file` or `file page_tag`, used in progress logs.
    pub fn label(&self) -> String {
        if self.page_tag.is_empty() {
            self.file.clone()
        } else {
            format!("{} {}", self.file, self.page_tag)
        }
    }
}

/// Unified document interface.
pub trait Document {
    /// Loads the document at `path`.
    ///
    /// Fails with a readable message when the file is missing or corrupt.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Page images in document order.
    fn get_pages(&self) -> Result<Vec<PageImage>>;
}

/// Display name used in logs and audit entries.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lowercased extension of `path`, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Downscales so the longer side is at most `max_side`, keeping the aspect
/// ratio. Images already small enough are returned unchanged.
pub fn fit_within(image: DynamicImage, max_side: u32) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let longest = w.max(h);
    if max_side == 0 || longest <= max_side {
        return image;
    }
    let scale = max_side as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    image.resize_exact(nw, nh, FilterType::Triangle)
}

// ============================================================================
// Image files
// ============================================================================

/// A single raster image file.
pub struct ImageDocument {
    path: PathBuf,
    max_side: u32,
}

impl ImageDocument {
    /// Loads with an explicit size cap instead of the fast-mode default.
    pub fn load_with_max_side(path: &Path, max_side: u32) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("image not found: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            max_side,
        })
    }
}

impl Document for ImageDocument {
    fn load(path: &Path) -> Result<Self> {
        Self::load_with_max_side(path, FAST_MAX_SIDE)
    }

    fn get_pages(&self) -> Result<Vec<PageImage>> {
        let decoded = image::open(&self.path)
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        let fitted = fit_within(decoded, self.max_side);
        log::debug!(
            "[Ingest] {} decoded at {}x{}",
            self.path.display(),
            fitted.width(),
            fitted.height()
        );
        Ok(vec![PageImage::new(
            display_name(&self.path),
            "",
            fitted.to_rgb8(),
        )])
    }
}
