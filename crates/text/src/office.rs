//! Text extraction from Office Open XML packages (DOCX, XLSX).
//!
//! Only the parts needed for visible text are read: paragraphs of the main
//! document, and the cell values of each worksheet with shared strings
//! resolved.

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Rows per worksheet in the XLSX format (`1048576`).
pub const MAX_ROWS: usize = 1_048_576;
/// Columns per worksheet in the XLSX format (`XFD`).
pub const MAX_COLUMNS: usize = 16_384;
/// Largest dense grid materialized for one sheet.
pub const MAX_GRID_CELLS: usize = 1 << 20;

// ============================================================================
// XML helpers
// ============================================================================

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| log::error!("[Text] XML pattern failed to compile: {}", e))
        .ok()
}

static ENTITY: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"&(lt|gt|amp|quot|apos|#[0-9]+|#x[0-9A-Fa-f]+);"));
static ATTRIBUTE: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r#"([A-Za-z_][\w:.-]*)="([^"]*)""#));

fn pattern(re: &'static Lazy<Option<Regex>>, what: &str) -> Result<&'static Regex> {
    re.as_ref()
        .ok_or_else(|| anyhow!("{} pattern unavailable", what))
}

fn unescape_xml(raw: &str) -> String {
    let Some(entity_re) = ENTITY.as_ref() else {
        return raw.to_string();
    };
    entity_re
        .replace_all(raw, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity[1..].parse().ok()
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn attributes(raw: &str) -> HashMap<&str, &str> {
    let Some(attribute_re) = ATTRIBUTE.as_ref() else {
        return HashMap::new();
    };
    attribute_re
        .captures_iter(raw)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect()
}

fn read_part(archive: &mut zip::ZipArchive<File>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(anyhow!("failed to open {}: {}", name, e)),
    };
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read {}", name))?;
    Ok(Some(xml))
}

fn open_package(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    zip::ZipArchive::new(file).with_context(|| format!("not an Office package: {}", path.display()))
}

// ============================================================================
// DOCX
// ============================================================================

// Empty paragraphs first: alternation is leftmost-first.
static PARAGRAPH: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>(.*?)</w:p>")
});
static RUN_TEXT: Lazy<Option<Regex>> = Lazy::new(|| {
    compile(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br(?:\s[^>]*)?/>")
});

fn paragraph_text(run_re: &Regex, body: &str) -> String {
    let mut text = String::new();
    for caps in run_re.captures_iter(body) {
        match caps.get(1) {
            Some(t) => text.push_str(&unescape_xml(t.as_str())),
            None if caps[0].starts_with("<w:tab") => text.push('\t'),
            None => text.push('\n'),
        }
    }
    text
}

/// Paragraphs of `word/document.xml`, one per line.
pub fn docx_paragraphs(document_xml: &str) -> Result<Vec<String>> {
    let paragraph_re = pattern(&PARAGRAPH, "paragraph")?;
    let run_re = pattern(&RUN_TEXT, "run text")?;
    Ok(paragraph_re
        .captures_iter(document_xml)
        .map(|caps| caps.get(1).map_or_else(String::new, |b| paragraph_text(run_re, b.as_str())))
        .collect())
}

/// Body text of a DOCX file, paragraphs joined with newlines.
pub fn read_docx_text(path: &Path) -> Result<String> {
    let mut archive = open_package(path)?;
    let xml = read_part(&mut archive, "word/document.xml")?
        .ok_or_else(|| anyhow!("{} has no word/document.xml", path.display()))?;
    let paragraphs = docx_paragraphs(&xml)?;
    log::debug!("[Text] {} paragraphs in {}", paragraphs.len(), path.display());
    Ok(paragraphs.join("\n"))
}

// ============================================================================
// XLSX
// ============================================================================

/// One worksheet as a grid of display strings, empty cells included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

static SHEET_ENTRY: Lazy<Option<Regex>> = Lazy::new(|| compile(r"<sheet\s([^>]*?)/?>"));
static RELATIONSHIP: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"<Relationship\s([^>]*?)/?>"));
static SHARED_ITEM: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?s)<si>(.*?)</si>|<si/>"));
static TEXT_NODE: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?s)<t(?:\s[^>]*)?>([^<]*)</t>"));
static ROW: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?s)<row\s([^>]*?)(?:/>|>(.*?)</row>)"));
static CELL: Lazy<Option<Regex>> =
    Lazy::new(|| compile(r"(?s)<c\s([^>]*?)(?:/>|>(.*?)</c>)"));
static VALUE: Lazy<Option<Regex>> = Lazy::new(|| compile(r"(?s)<v>([^<]*)</v>"));

fn joined_text_nodes(xml: &str) -> String {
    let Some(text_re) = TEXT_NODE.as_ref() else {
        return String::new();
    };
    text_re
        .captures_iter(xml)
        .map(|c| unescape_xml(&c[1]))
        .collect()
}

/// Shared string table, rich-text runs flattened.
pub fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let item_re = pattern(&SHARED_ITEM, "shared string")?;
    Ok(item_re
        .captures_iter(xml)
        .map(|caps| caps.get(1).map_or_else(String::new, |b| joined_text_nodes(b.as_str())))
        .collect())
}

/// Zero-based column of a cell reference such as `AB12`. `None` when the
/// reference has no letters or its column lies past `XFD`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1).filter(|col| *col < MAX_COLUMNS)
}

fn row_number(reference: &str) -> Result<usize> {
    let number = reference
        .trim()
        .parse::<usize>()
        .map_err(|_| anyhow!("invalid row reference {:?}", reference))?;
    if number == 0 || number > MAX_ROWS {
        bail!("row reference {} outside 1..={}", number, MAX_ROWS);
    }
    Ok(number)
}

fn cell_value(kind: Option<&str>, body: &str, shared: &[String]) -> String {
    let raw = VALUE
        .as_ref()
        .and_then(|re| re.captures(body))
        .map(|c| unescape_xml(&c[1]));
    match kind {
        Some("s") => raw
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => joined_text_nodes(body),
        Some("b") => match raw.as_deref() {
            Some("1") => "TRUE".to_string(),
            Some("0") => "FALSE".to_string(),
            _ => String::new(),
        },
        _ => raw.unwrap_or_default(),
    }
}

/// Cell grid of one worksheet part. Rows and columns missing from the XML
/// come back as empty strings so the layout matches the sheet.
///
/// References outside the XLSX row and column limits, and sheets whose grid
/// would exceed [`MAX_GRID_CELLS`], are errors.
pub fn worksheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>> {
    let row_re = pattern(&ROW, "row")?;
    let cell_re = pattern(&CELL, "cell")?;

    let mut by_row: Vec<(usize, Vec<(usize, String)>)> = Vec::new();
    let mut max_cols = 0;

    for row in row_re.captures_iter(xml) {
        let attrs = attributes(&row[1]);
        let number = match attrs.get("r") {
            Some(r) => row_number(r)?,
            None => by_row.last().map_or(1, |(n, _)| n + 1),
        };
        if number > MAX_ROWS {
            bail!("row {} outside 1..={}", number, MAX_ROWS);
        }

        let mut cells = Vec::new();
        if let Some(body) = row.get(2) {
            for (position, cell) in cell_re.captures_iter(body.as_str()).enumerate() {
                let attrs = attributes(&cell[1]);
                let col = match attrs.get("r") {
                    Some(r) => column_index(r)
                        .ok_or_else(|| anyhow!("cell reference {:?} out of range", r))?,
                    None if position < MAX_COLUMNS => position,
                    None => bail!("row {} has more than {} cells", number, MAX_COLUMNS),
                };
                let value = cell_value(
                    attrs.get("t").copied(),
                    cell.get(2).map_or("", |b| b.as_str()),
                    shared,
                );
                max_cols = max_cols.max(col + 1);
                cells.push((col, value));
            }
        }
        by_row.push((number, cells));
    }

    let Some(first) = by_row.iter().map(|(n, _)| *n).min() else {
        return Ok(Vec::new());
    };
    let last = by_row.iter().map(|(n, _)| *n).max().unwrap_or(first);

    let height = last - first + 1;
    if height.saturating_mul(max_cols) > MAX_GRID_CELLS {
        bail!(
            "sheet spans {} rows x {} columns, more than {} cells",
            height,
            max_cols,
            MAX_GRID_CELLS
        );
    }

    let mut grid = vec![vec![String::new(); max_cols]; height];
    for (number, cells) in by_row {
        for (col, value) in cells {
            grid[number - first][col] = value;
        }
    }
    Ok(grid)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Every worksheet of an XLSX file, in workbook order.
pub fn read_xlsx_sheets(path: &Path) -> Result<Vec<Sheet>> {
    let sheet_re = pattern(&SHEET_ENTRY, "sheet entry")?;
    let relationship_re = pattern(&RELATIONSHIP, "relationship")?;

    let mut archive = open_package(path)?;
    let workbook = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| anyhow!("{} has no xl/workbook.xml", path.display()))?;
    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };

    let targets: HashMap<String, String> = relationship_re
        .captures_iter(&rels)
        .filter_map(|c| {
            let attrs = attributes(c.get(1)?.as_str());
            Some((attrs.get("Id")?.to_string(), resolve_target(attrs.get("Target")?)))
        })
        .collect();

    let mut sheets = Vec::new();
    for (position, entry) in sheet_re.captures_iter(&workbook).enumerate() {
        let attrs = attributes(&entry[1]);
        let name = attrs
            .get("name")
            .map(|n| unescape_xml(n))
            .unwrap_or_else(|| format!("Sheet{}", position + 1));

        let part = attrs
            .get("r:id")
            .and_then(|id| targets.get(*id).cloned())
            .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", position + 1));

        let Some(xml) = read_part(&mut archive, &part)? else {
            log::warn!("[Text] sheet {} missing part {}", name, part);
            continue;
        };
        let rows = worksheet_rows(&xml, &shared)
            .with_context(|| format!("sheet {} in {}", name, path.display()))?;
        log::debug!("[Text] sheet {}: {} rows", name, rows.len());
        sheets.push(Sheet { name, rows });
    }

    Ok(sheets)
}
