//! Page rasterization (pdfium-render).

use anyhow::{anyhow, Result};
use deid_core::document::{display_name, fit_within};
use deid_core::{Capability, Document, PageImage, Unavailable};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use std::path::{Path, PathBuf};

/// Rasterization density for PDF pages.
pub const DEFAULT_DPI: u32 = 170;
/// Longest side of a rasterized page after downscaling.
pub const DEFAULT_MAX_PX: u32 = 1800;

/// PDF user space is 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Directories searched for the pdfium shared library before the system one.
fn pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(dir) = std::env::var("PDFIUM_LIB_DIR") {
        paths.push(PathBuf::from(dir));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());

            #[cfg(target_os = "macos")]
            {
                if let Some(contents_dir) = exe_dir.parent() {
                    paths.push(contents_dir.join("Resources").join("libs"));
                }
            }
        }
    }

    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));
    paths
}

/// Binds the pdfium library, trying the bundled locations first.
pub fn bind_pdfium() -> Result<Pdfium, Unavailable> {
    for path in pdfium_search_paths() {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(&path);
        log::debug!("[PDF] trying pdfium at {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::info!("[PDF] pdfium loaded from {:?}", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    log::debug!("[PDF] trying system pdfium");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Unavailable::new(Capability::PdfRenderer, e.to_string()))
}

/// Target pixel size for a page of `width_pt` x `height_pt` points.
fn target_size(width_pt: f32, height_pt: f32, dpi: u32) -> (i32, i32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    (
        ((width_pt * scale) as i32).max(1),
        ((height_pt * scale) as i32).max(1),
    )
}

/// A PDF file, rasterized page by page.
pub struct PdfDocument {
    path: PathBuf,
    dpi: u32,
    max_px: u32,
}

impl PdfDocument {
    pub fn load_with(path: &Path, dpi: u32, max_px: u32) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("PDF not found: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            dpi: dpi.max(1),
            max_px,
        })
    }
}

impl Document for PdfDocument {
    fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, DEFAULT_DPI, DEFAULT_MAX_PX)
    }

    fn get_pages(&self) -> Result<Vec<PageImage>> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(&self.path, None)
            .map_err(|e| anyhow!("failed to open {}: {}", self.path.display(), e))?;

        let file = display_name(&self.path);
        let mut pages = Vec::new();

        for (index, page) in document.pages().iter().enumerate() {
            let (width, height) = target_size(page.width().value, page.height().value, self.dpi);
            let config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_target_height(height);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| anyhow!("failed to render page {}: {}", index + 1, e))?;
            let image = fit_within(bitmap.as_image(), self.max_px);

            log::debug!(
                "[PDF] {} page {}: {}x{} px",
                file,
                index + 1,
                image.width(),
                image.height()
            );
            pages.push(PageImage::new(
                file.clone(),
                format!("(p{})", index + 1),
                image.to_rgb8(),
            ));
        }

        log::info!("[PDF] {} rasterized, {} pages", file, pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_size_letter_page() {
        // US Letter at 170 dpi.
        assert_eq!(target_size(612.0, 792.0, 170), (1445, 1870));
        assert_eq!(target_size(612.0, 792.0, 72), (612, 792));
        assert_eq!(target_size(0.0, 0.0, 170), (1, 1));
    }

    #[test]
    fn test_missing_pdf_fails_to_load() {
        assert!(PdfDocument::load(Path::new("/nonexistent/scan.pdf")).is_err());
    }

    #[test]
    fn test_corrupt_pdf_fails_to_rasterize() {
        let path = std::env::temp_dir().join(format!("deid_corrupt_{}.pdf", std::process::id()));
        std::fs::write(&path, b"not a pdf").unwrap();

        let doc = PdfDocument::load(&path).unwrap();
        // Either pdfium is missing or it rejects the file; both are errors.
        assert!(doc.get_pages().is_err());

        let _ = std::fs::remove_file(path);
    }
}
