//! Input dispatch by file extension.

use deid_core::document::{extension_of, FAST_MAX_SIDE, FULL_MAX_SIDE, IMAGE_EXTENSIONS};
use deid_core::{Document, ImageDocument, PageImage};
use deid_pdf::PdfDocument;
use deid_text::{TextDocument, TEXT_EXTENSIONS};
use std::path::{Path, PathBuf};

use crate::config::DeidConfig;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub full_quality: bool,
    pub pdf_dpi: u32,
    pub pdf_max_px: u32,
    pub font_path: Option<PathBuf>,
}

impl From<&DeidConfig> for IngestOptions {
    fn from(config: &DeidConfig) -> Self {
        Self {
            full_quality: !config.fast_mode,
            pdf_dpi: config.pdf_dpi,
            pdf_max_px: config.pdf_max_px,
            font_path: config.font_path.as_ref().map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Image,
    Pdf,
    Text,
}

fn input_kind(path: &Path) -> Result<InputKind, IngestError> {
    let ext = extension_of(path).unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputKind::Image)
    } else if ext == "pdf" {
        Ok(InputKind::Pdf)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputKind::Text)
    } else if ext.is_empty() {
        Err(IngestError::Unsupported("(no extension)".to_string()))
    } else {
        Err(IngestError::Unsupported(format!(".{}", ext)))
    }
}

/// Page images of the file at `path`, in document order.
pub fn load_pages(path: &Path, options: &IngestOptions) -> Result<Vec<PageImage>, IngestError> {
    let pages = match input_kind(path)? {
        InputKind::Image => {
            let max_side = if options.full_quality {
                FULL_MAX_SIDE
            } else {
                FAST_MAX_SIDE
            };
            ImageDocument::load_with_max_side(path, max_side)?.get_pages()?
        }
        InputKind::Pdf => {
            PdfDocument::load_with(path, options.pdf_dpi, options.pdf_max_px)?.get_pages()?
        }
        InputKind::Text => {
            TextDocument::load_with_font(path, options.font_path.as_deref())?.get_pages()?
        }
    };
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn options() -> IngestOptions {
        IngestOptions::from(&DeidConfig::default())
    }

    #[test]
    fn test_input_kind() {
        assert_eq!(input_kind(Path::new("a.PNG")).unwrap(), InputKind::Image);
        assert_eq!(input_kind(Path::new("a.tiff")).unwrap(), InputKind::Image);
        assert_eq!(input_kind(Path::new("a.pdf")).unwrap(), InputKind::Pdf);
        assert_eq!(input_kind(Path::new("a.xlsx")).unwrap(), InputKind::Text);
        assert!(matches!(
            input_kind(Path::new("a.pptx")),
            Err(IngestError::Unsupported(ext)) if ext == ".pptx"
        ));
        assert!(matches!(
            input_kind(Path::new("Makefile")),
            Err(IngestError::Unsupported(_))
        ));
    }

    #[test]
    fn test_image_respects_quality() {
        let path = std::env::temp_dir().join(format!("deid_ingest_{}.png", std::process::id()));
        RgbImage::from_pixel(3200, 100, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let fast = load_pages(&path, &options()).unwrap();
        assert_eq!(fast[0].pixels.width(), FAST_MAX_SIDE);

        let full = IngestOptions {
            full_quality: true,
            ..options()
        };
        assert_eq!(load_pages(&path, &full).unwrap()[0].pixels.width(), FULL_MAX_SIDE);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(matches!(
            load_pages(Path::new("/nonexistent/a.jpg"), &options()),
            Err(IngestError::Failed(_))
        ));
    }
}
