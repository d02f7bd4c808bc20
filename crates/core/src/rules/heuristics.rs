//! Line heuristics
//!
//! Address recognition works on whole lines rather than on token spans: a
//! line is reported when it mentions an address hint word or looks like a
//! street line (`12 Main St, Springfield, IL 62704`).

use once_cell::sync::Lazy;
use regex::Regex;

/// Hint words, matched as case-insensitive substrings of a line.
pub const ADDRESS_HINT_WORDS: &[&str] = &[
    "address", "addr.", "street", "st.", "road", "rd.", "lane", "ln.", "avenue", "ave.",
    "boulevard", "blvd", "city", "state", "zip", "pincode", "pin",
];

/// Lines must be longer than this (in characters, after trimming).
const MIN_LINE_CHARS: usize = 6;
/// Reported text is cut to this many characters.
const MAX_MATCH_CHARS: usize = 200;

static STREET_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\d{1,5}\s+[A-Za-z0-9. -]+,\s*[A-Za-z. -]+[, ]+\w{2}\s+\d{4,6}")
        .map_err(|e| log::error!("[Rules] street pattern failed to compile: {}", e))
        .ok()
});

/// Heuristic hit with byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMatch {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Address-like lines of `text`, in line order.
///
/// `start..end` covers the trimmed line; `text` is the trimmed line cut to
/// 200 characters.
pub fn match_address(text: &str) -> Vec<HeuristicMatch> {
    let mut matches = Vec::new();

    for (offset, line) in lines_with_offsets(text) {
        if !is_address_line(line) {
            continue;
        }

        let trimmed = line.trim();
        if trimmed.chars().count() <= MIN_LINE_CHARS {
            continue;
        }

        let lead = line.len() - line.trim_start().len();
        let start = offset + lead;
        matches.push(HeuristicMatch {
            text: trimmed.chars().take(MAX_MATCH_CHARS).collect(),
            start,
            end: start + trimmed.len(),
        });
    }

    matches
}

fn is_address_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if ADDRESS_HINT_WORDS.iter().any(|k| lower.contains(k)) {
        return true;
    }
    STREET_LINE
        .as_ref()
        .map_or(false, |re| re.is_match(line))
}

/// Splits on `\n`, dropping a trailing `\r`, and yields each line with its
/// byte offset.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split('\n').map(move |raw| {
        let start = offset;
        offset += raw.len() + 1;
        (start, raw.strip_suffix('\r').unwrap_or(raw))
    })
}

// ============================================================================
// Tests
// ============================================================================
