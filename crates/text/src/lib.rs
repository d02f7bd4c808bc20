//! Text-bearing documents (.txt, .md, .docx, .xlsx)
//!
//! The text is laid out on white A4-sized canvases so these files go through
//! the same OCR, detection and redaction path as scanned pages.

pub mod canvas;
pub mod office;

use anyhow::{anyhow, Context, Result};
use deid_core::document::{display_name, extension_of};
use deid_core::{Document, PageImage};
use std::fs;
use std::path::{Path, PathBuf};

pub use canvas::{load_font, plan_lines, render_page, Layout, DOCUMENT_LAYOUT, SHEET_LAYOUT};
pub use office::{read_docx_text, read_xlsx_sheets, Sheet};

/// Extensions handled by [`TextDocument`].
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "docx", "xlsx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Plain,
    Docx,
    Xlsx,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match extension_of(path)?.as_str() {
            "txt" | "md" => Some(Format::Plain),
            "docx" => Some(Format::Docx),
            "xlsx" => Some(Format::Xlsx),
            _ => None,
        }
    }
}

/// A text-bearing document, rendered to page images on demand.
pub struct TextDocument {
    path: PathBuf,
    format: Format,
    font_path: Option<PathBuf>,
}

impl TextDocument {
    /// Loads with an explicit font file instead of the system search.
    pub fn load_with_font(path: &Path, font_path: Option<&Path>) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("file not found: {}", path.display()));
        }
        let format = Format::from_path(path)
            .ok_or_else(|| anyhow!("not a text document: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            font_path: font_path.map(Path::to_path_buf),
        })
    }
}

impl Document for TextDocument {
    fn load(path: &Path) -> Result<Self> {
        Self::load_with_font(path, None)
    }

    fn get_pages(&self) -> Result<Vec<PageImage>> {
        let font = load_font(self.font_path.as_deref())?;
        let file = display_name(&self.path);

        let pages = match self.format {
            Format::Plain => {
                let bytes = fs::read(&self.path)
                    .with_context(|| format!("failed to read {}", self.path.display()))?;
                let text = String::from_utf8_lossy(&bytes);
                vec![PageImage::new(
                    file.clone(),
                    "",
                    render_page(text.lines(), &font, &DOCUMENT_LAYOUT),
                )]
            }
            Format::Docx => {
                let text = read_docx_text(&self.path)?;
                vec![PageImage::new(
                    file.clone(),
                    "",
                    render_page(text.lines(), &font, &DOCUMENT_LAYOUT),
                )]
            }
            Format::Xlsx => read_xlsx_sheets(&self.path)?
                .into_iter()
                .map(|sheet| {
                    let rows: Vec<String> = sheet.rows.iter().map(|r| r.join(" | ")).collect();
                    let pixels =
                        render_page(rows.iter().map(String::as_str), &font, &SHEET_LAYOUT);
                    PageImage::new(file.clone(), format!("[{}]", sheet.name), pixels)
                })
                .collect(),
        };

        log::info!("[Text] {} rendered to {} pages", file, pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.TXT")), Some(Format::Plain));
        assert_eq!(Format::from_path(Path::new("notes.md")), Some(Format::Plain));
        assert_eq!(Format::from_path(Path::new("b.docx")), Some(Format::Docx));
        assert_eq!(Format::from_path(Path::new("c.xlsx")), Some(Format::Xlsx));
        assert_eq!(Format::from_path(Path::new("d.pdf")), None);
    }

    #[test]
    fn test_load_rejects_missing_and_foreign_files() {
        assert!(TextDocument::load(Path::new("/nonexistent/a.txt")).is_err());

        let path = std::env::temp_dir().join(format!("deid_text_{}.csv", std::process::id()));
        fs::write(&path, "a,b").unwrap();
        assert!(TextDocument::load(&path).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_plain_text_single_page() {
        let path = std::env::temp_dir().join(format!("deid_text_{}.txt", std::process::id()));
        fs::write(&path, "Patient: John Smith\nPhone 555-123-4567\n").unwrap();

        let doc = TextDocument::load(&path).unwrap();
        match doc.get_pages() {
            Ok(pages) => {
                assert_eq!(pages.len(), 1);
                assert_eq!(pages[0].pixels.dimensions(), (canvas::PAGE_WIDTH, canvas::PAGE_HEIGHT));
                assert!(pages[0].page_tag.is_empty());
                assert_eq!(pages[0].file, display_name(&path));
            }
            // No usable font on this machine.
            Err(e) => assert!(e.to_string().contains("font"), "{}", e),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_docx_single_page_keeps_file_name() {
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("deid_text_{}.docx", std::process::id()));
        let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<w:document><w:body><w:p><w:r><w:t>Email jane@example.com</w:t></w:r></w:p></w:body></w:document>")
            .unwrap();
        zip.finish().unwrap();

        let doc = TextDocument::load(&path).unwrap();
        match doc.get_pages() {
            Ok(pages) => {
                assert_eq!(pages.len(), 1);
                assert_eq!(pages[0].file, display_name(&path));
                assert!(pages[0].page_tag.is_empty());
            }
            Err(e) => assert!(e.to_string().contains("font"), "{}", e),
        }

        let _ = fs::remove_file(path);
    }
}
