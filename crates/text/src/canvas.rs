//! Text-to-canvas rendering.

use ab_glyph::{Font, FontVec, PxScale};
use deid_core::{Capability, Unavailable};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::path::{Path, PathBuf};

/// A4 at 200 dpi.
pub const PAGE_WIDTH: u32 = 1654;
pub const PAGE_HEIGHT: u32 = 2339;
pub const MARGIN: i32 = 40;

const FONT_FILE: &str = "DejaVuSans.ttf";

/// Where lines go on a canvas and when to stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub font_px: f32,
    pub line_step: i32,
    /// Characters kept per line.
    pub max_chars: usize,
    /// Rendering stops once the next line would start below this.
    pub max_y: i32,
}

/// Paragraph text (plain files, DOCX).
pub const DOCUMENT_LAYOUT: Layout = Layout {
    font_px: 18.0,
    line_step: 24,
    max_chars: 1800,
    max_y: 2300,
};

/// Spreadsheet rows (XLSX).
pub const SHEET_LAYOUT: Layout = Layout {
    font_px: 16.0,
    line_step: 22,
    max_chars: 2000,
    max_y: 2280,
};

fn font_candidates() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(FONT_FILE),
        PathBuf::from("/usr/share/fonts/truetype/dejavu").join(FONT_FILE),
        PathBuf::from("/usr/share/fonts/TTF").join(FONT_FILE),
        PathBuf::from("/usr/share/fonts/dejavu").join(FONT_FILE),
        PathBuf::from("/usr/share/fonts/dejavu-sans-fonts").join(FONT_FILE),
        PathBuf::from("/Library/Fonts").join(FONT_FILE),
    ];
    if let Ok(windir) = std::env::var("WINDIR") {
        paths.push(PathBuf::from(windir).join("Fonts").join(FONT_FILE));
    }
    paths
}

fn read_font(path: &Path) -> Result<FontVec, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    FontVec::try_from_vec(bytes).map_err(|e| format!("{}: {}", path.display(), e))
}

/// Loads `explicit` if given, otherwise the first DejaVu Sans found on the
/// system.
pub fn load_font(explicit: Option<&Path>) -> Result<FontVec, Unavailable> {
    if let Some(path) = explicit {
        return read_font(path).map_err(|e| Unavailable::new(Capability::Font, e));
    }

    for path in font_candidates() {
        if !path.is_file() {
            continue;
        }
        match read_font(&path) {
            Ok(font) => {
                log::debug!("[Text] using font {}", path.display());
                return Ok(font);
            }
            Err(e) => log::warn!("[Text] skipping font {}", e),
        }
    }

    Err(Unavailable::new(
        Capability::Font,
        format!("{} not found; set fontPath in the config", FONT_FILE),
    ))
}

/// Vertical placement of `lines`: `(y, text)` per drawn line, text cut
/// to the layout's character limit.
pub fn plan_lines<'a, I>(lines: I, layout: &Layout) -> Vec<(i32, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut placed = Vec::new();
    let mut y = MARGIN;

    for line in lines {
        placed.push((y, line.chars().take(layout.max_chars).collect()));
        y += layout.line_step;
        if y > layout.max_y {
            break;
        }
    }
    placed
}

/// White page with `lines` drawn in black from the top-left margin.
pub fn render_page<'a, I, F>(lines: I, font: &F, layout: &Layout) -> RgbImage
where
    I: IntoIterator<Item = &'a str>,
    F: Font,
{
    let mut page = RgbImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Rgb([255, 255, 255]));
    let scale = PxScale::from(layout.font_px);

    for (y, text) in plan_lines(lines, layout) {
        if text.trim().is_empty() {
            continue;
        }
        draw_text_mut(&mut page, Rgb([0, 0, 0]), MARGIN, y, scale, font, &text);
    }
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_stops_at_page_bottom() {
        let lines: Vec<String> = (0..200).map(|i| format!("line {}", i)).collect();

        let doc = plan_lines(lines.iter().map(String::as_str), &DOCUMENT_LAYOUT);
        assert_eq!(doc.len(), 95);
        assert_eq!(doc[0], (40, "line 0".to_string()));
        assert_eq!(doc[1].0, 64);

        let sheet = plan_lines(lines.iter().map(String::as_str), &SHEET_LAYOUT);
        assert_eq!(sheet.len(), 102);
        assert_eq!(sheet[1].0, 62);
    }

    #[test]
    fn test_plan_truncates_by_chars() {
        let long = "é".repeat(2500);
        let planned = plan_lines([long.as_str()], &DOCUMENT_LAYOUT);
        assert_eq!(planned[0].1.chars().count(), 1800);
    }

    #[test]
    fn test_explicit_missing_font_unavailable() {
        let err = load_font(Some(Path::new("/nonexistent/font.ttf"))).err().unwrap();
        assert_eq!(err.capability, Capability::Font);
    }

    #[test]
    fn test_render_draws_ink_when_font_present() {
        let Ok(font) = load_font(None) else {
            return;
        };
        let page = render_page(["Jane Doe 555-123-4567"], &font, &DOCUMENT_LAYOUT);
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        let ink = page
            .enumerate_pixels()
            .filter(|(_, y, p)| *y < 80 && p[0] < 128)
            .count();
        assert!(ink > 20);
    }
}
