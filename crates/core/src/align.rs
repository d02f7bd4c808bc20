//! Spatial alignment of text hits onto OCR line boxes.
//!
//! Text findings are located against the page text, which has no geometry.
//! Each hit is placed on the first OCR line that contains it, verbatim first
//! and then in normalized form. The granularity is the whole line: the box of
//! the containing line is used, not the sub-span of the hit.

use crate::types::{BBox, Finding, OcrLine, TextMatch};

/// Normalized matches shorter than this are never placed.
const MIN_NORMALIZED_CHARS: usize = 4;

/// Places every match on a line box. Output is 1:1 and order-preserving;
/// hits that cannot be placed keep [`BBox::UNLOCATED`].
pub fn align_findings(matches: Vec<TextMatch>, lines: &[OcrLine]) -> Vec<Finding> {
    // Normalize each line once, not once per match.
    let normalized: Vec<String> = lines.iter().map(|l| normalize(&l.text)).collect();

    let findings: Vec<Finding> = matches
        .into_iter()
        .map(|m| {
            let bbox = locate_in(&m.matched, lines, &normalized);
            Finding::text(m.label, m.matched, bbox)
        })
        .collect();

    let unplaced = findings.iter().filter(|f| !f.is_located()).count();
    if unplaced > 0 {
        log::debug!("[Align] {} of {} findings unplaced", unplaced, findings.len());
    }
    findings
}

/// Box of the first line holding `target`, or [`BBox::UNLOCATED`].
pub fn locate(target: &str, lines: &[OcrLine]) -> BBox {
    let normalized: Vec<String> = lines.iter().map(|l| normalize(&l.text)).collect();
    locate_in(target, lines, &normalized)
}

fn locate_in(target: &str, lines: &[OcrLine], normalized: &[String]) -> BBox {
    if !target.is_empty() {
        if let Some(line) = lines.iter().find(|l| l.text.contains(target)) {
            return line.bbox;
        }
    }

    let needle = normalize(target);
    if needle.chars().count() >= MIN_NORMALIZED_CHARS {
        if let Some(idx) = normalized.iter().position(|l| l.contains(needle.as_str())) {
            return lines[idx].bbox;
        }
    }

    BBox::UNLOCATED
}

/// Lowercases and keeps word characters only (letters, digits, `_`).
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;

    fn line(text: &str, x: i32) -> OcrLine {
        OcrLine::new(text, BBox::new(x, 10, 100, 20), 0.9)
    }

    #[test]
    fn test_exact_match_wins_over_normalized() {
        // Line 0 holds the target only after normalization, line 1 verbatim.
        let lines = vec![line("555 123 4567", 0), line("call 555-123-4567", 200)];
        let out = align_findings(
            vec![TextMatch::new(Label::Phone, "555-123-4567", 0..12)],
            &lines,
        );
        assert_eq!(out[0].bbox(), lines[1].bbox);
    }

    #[test]
    fn test_first_line_wins() {
        let lines = vec![line("id 42 x", 0), line("id 42 y", 200)];
        assert_eq!(locate("id 42", &lines), lines[0].bbox);
    }

    #[test]
    fn test_normalized_match() {
        let lines = vec![line("Jane Doe", 0), line("E-mail: JANE@EXAMPLE.COM", 200)];
        assert_eq!(locate("jane@example.com", &lines), lines[1].bbox);
    }

    #[test]
    fn test_short_normalized_target_unplaced() {
        let lines = vec![line("A-B-C", 0)];
        assert_eq!(locate("a b c", &lines), BBox::UNLOCATED);
    }

    #[test]
    fn test_output_is_one_to_one() {
        let lines = vec![line("alpha beta", 0)];
        let matches = vec![
            TextMatch::new(Label::Person, "gamma", 0..5),
            TextMatch::new(Label::Person, "beta", 6..10),
            TextMatch::new(Label::Person, "", 0..0),
        ];
        let out = align_findings(matches, &lines);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].bbox(), BBox::UNLOCATED);
        assert_eq!(out[1].bbox(), lines[0].bbox);
        assert_eq!(out[1].matched(), Some("beta"));
        assert_eq!(out[2].bbox(), BBox::UNLOCATED);
    }

    #[test]
    fn test_no_lines() {
        assert_eq!(locate("anything", &[]), BBox::UNLOCATED);
    }
}
