//! Text-finding rules
//!
//! A fixed, ordered catalog of PII patterns. Every category scans the full
//! page text independently: matches never overlap within a category, but
//! different categories may claim the same characters and all of them are
//! kept.

pub mod heuristics;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Label, TextMatch};
pub use heuristics::{match_address, HeuristicMatch};

// ============================================================================
// Catalog
// ============================================================================

/// How a pattern's edges are checked against the surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Accept whatever the expression matches.
    Plain,
    /// Reject matches preceded or followed by an ASCII digit, so a 12-digit
    /// run is never reported as a fragment of a longer number.
    DigitGuarded,
}

/// One catalog entry.
#[derive(Debug)]
pub struct PatternRule {
    pub label: Label,
    pub boundary: Boundary,
    regex: Regex,
}

impl PatternRule {
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// All accepted matches of this rule in `text`, left to right.
    pub fn find_all(&self, text: &str) -> Vec<TextMatch> {
        match self.boundary {
            Boundary::Plain => self
                .regex
                .find_iter(text)
                .map(|m| TextMatch::new(self.label, m.as_str(), m.range()))
                .collect(),
            Boundary::DigitGuarded => find_digit_guarded(&self.regex, text)
                .into_iter()
                .map(|range| TextMatch::new(self.label, &text[range.clone()], range))
                .collect(),
        }
    }
}

const CATALOG_SOURCE: &[(Label, Boundary, &str)] = &[
    (
        Label::Email,
        Boundary::Plain,
        r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[A-Za-z]{2,}\b",
    ),
    (
        Label::Phone,
        Boundary::DigitGuarded,
        r"(?:\+?\d{1,3}[\s-]?)?\(?\d{3}\)?[\s-]?\d{3}[\s-]?\d{4}",
    ),
    (
        Label::Aadhaar,
        Boundary::DigitGuarded,
        r"\d{4}[\s-]?\d{4}[\s-]?\d{4}",
    ),
    (Label::Pan, Boundary::Plain, r"\b[A-Z]{5}[0-9]{4}[A-Z]\b"),
    (
        Label::Gstin,
        Boundary::Plain,
        r"\b[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]\b",
    ),
    (Label::Ifsc, Boundary::Plain, r"\b[A-Z]{4}0[A-Z0-9]{6}\b"),
    (Label::Ssn, Boundary::Plain, r"\b\d{3}-\d{2}-\d{4}\b"),
    (Label::Npi, Boundary::Plain, r"\b\d{10}\b"),
    (
        Label::Passport,
        Boundary::Plain,
        r"\b[A-PR-WYa-pr-wy][0-9]{7,8}\b",
    ),
    (Label::DlGeneric, Boundary::Plain, r"\b[A-Z0-9]{6,15}\b"),
    (
        Label::CreditCard,
        Boundary::Plain,
        r"(?:\d{4}[ -]?){3}\d{4}",
    ),
    (
        Label::Cvv,
        Boundary::Plain,
        r"(?i)\b(?:CVV2?|CVC2?|security\s+code)\s*[:#-]?\s*\d{3,4}\b",
    ),
    (Label::BankAcc, Boundary::DigitGuarded, r"\d{9,18}"),
    (
        Label::Dob,
        Boundary::Plain,
        r"(?i)\b(?:DOB|Date of Birth|Birth Date)\s*[:-]?\s*(?:\d{1,2}[/-]\d{1,2}[/-](?:19|20)\d{2}|[A-Za-z]{3,9}\s+\d{1,2},\s+(?:19|20)\d{2})\b",
    ),
    (
        Label::Icd10,
        Boundary::Plain,
        r"\b[A-TV-Z][0-9][0-9AB](?:\.[0-9A-TV-Z]{1,4})?\b",
    ),
    (
        Label::Ip,
        Boundary::Plain,
        r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d?\d)\b",
    ),
    (
        Label::Mac,
        Boundary::Plain,
        r"\b(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}\b",
    ),
    (Label::Url, Boundary::Plain, r"https?://\S+"),
    (
        Label::InsuranceId,
        Boundary::Plain,
        r"(?i)\b(?:Member\s*ID|Policy\s*No\.?|Subscriber\s*ID|Payer\s*ID|Group\s*No\.?)\s*[:-]?\s*[A-Z0-9-]{5,20}\b",
    ),
];

static CATALOG: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    CATALOG_SOURCE
        .iter()
        .filter_map(|(label, boundary, pattern)| match Regex::new(pattern) {
            Ok(regex) => Some(PatternRule {
                label: *label,
                boundary: *boundary,
                regex,
            }),
            Err(e) => {
                log::error!("[Rules] pattern for {} failed to compile: {}", label, e);
                None
            }
        })
        .collect()
});

/// The pattern catalog in evaluation order.
pub fn catalog() -> &'static [PatternRule] {
    &CATALOG
}

// ============================================================================
// Extraction
// ============================================================================

/// Runs every catalog pattern, then the address heuristic, over `text`.
///
/// Results are grouped by category in catalog order, left to right within a
/// category; address lines come last.
pub fn extract_text_findings(text: &str) -> Vec<TextMatch> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut findings = Vec::new();
    for rule in catalog() {
        findings.extend(rule.find_all(text));
    }

    findings.extend(
        match_address(text)
            .into_iter()
            .map(|m| TextMatch::new(Label::Address, m.text, m.start..m.end)),
    );

    log::debug!("[Rules] {} text findings", findings.len());
    findings
}

/// Left-to-right scan that rejects candidates touching a neighbouring ASCII
/// digit. A rejected candidate resumes the scan one character after its
/// start.
fn find_digit_guarded(regex: &Regex, text: &str) -> Vec<std::ops::Range<usize>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let m = match regex.find_at(text, pos) {
            Some(m) => m,
            None => break,
        };

        if touches_digit(text, m.start(), m.end()) {
            pos = m.start() + char_width_at(text, m.start());
            continue;
        }

        found.push(m.range());
        pos = if m.end() > m.start() {
            m.end()
        } else {
            m.end() + char_width_at(text, m.end())
        };
    }

    found
}

fn touches_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.map_or(false, |c| c.is_ascii_digit()) || after.map_or(false, |c| c.is_ascii_digit())
}

fn char_width_at(text: &str, idx: usize) -> usize {
    text[idx..].chars().next().map_or(1, char::len_utf8)
}

/// Masks the middle of a snippet for log output.
pub fn mask_snippet(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= 4 {
        "*".repeat(len)
    } else {
        let visible = 4.min(len / 3);
        let prefix: String = chars[..visible].iter().collect();
        let suffix: String = chars[len - visible..].iter().collect();
        format!("{}****{}", prefix, suffix)
    }
}
