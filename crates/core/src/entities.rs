//! Named-entity pass
//!
//! A lexicon-driven recognizer for PERSON, ORGANIZATION and LOCATION spans.
//! It works on runs of capitalized words and a handful of anchors:
//! - honorifics (`Dr. Jane Doe`) and field cues (`Patient Name: Ravi Kumar`)
//! - known given names heading a capitalized run
//! - organisation suffixes (`Acme Corp`) and prefixes (`Bank of Baroda`)
//! - a location gazetteer
//!
//! The lexicon is JSON. A default one is compiled into the binary; a user file
//! can replace it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::ops::Range;
use std::path::PathBuf;
use whatlang::Lang;

use crate::align::align_findings;
use crate::error::{Capability, Unavailable};
use crate::types::{Finding, Label, OcrLine, TextMatch};

const BUILTIN_LEXICON: &str = include_str!("../data/entities.json");

/// Capitalized word, allowing inner apostrophes, hyphens and ampersands.
const WORD: &str = r"\p{Lu}[\p{L}'&-]*";

static CAPITALIZED_RUN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(&format!(r"\b{WORD}(?:[ \t]+{WORD})*"))
        .map_err(|e| log::error!("[Entities] run pattern failed to compile: {}", e))
        .ok()
});

static WORD_TOKEN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(WORD)
        .map_err(|e| log::error!("[Entities] token pattern failed to compile: {}", e))
        .ok()
});

// ============================================================================
// Lexicon
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Lexicon {
    #[allow(dead_code)]
    version: String,
    #[serde(default)]
    honorifics: Vec<String>,
    #[serde(default)]
    person_cues: Vec<String>,
    #[serde(default)]
    given_names: Vec<String>,
    #[serde(default)]
    org_suffixes: Vec<String>,
    #[serde(default)]
    org_prefixes: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
    #[serde(default)]
    stopwords: Vec<String>,
}

/// Where to read the lexicon from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconSource {
    Builtin,
    Path(PathBuf),
}

// ============================================================================
// Model
// ============================================================================

/// Compiled recognizer.
#[derive(Debug)]
pub struct EntityModel {
    honorific: Option<Regex>,
    cue: Option<Regex>,
    org_prefix: Option<Regex>,
    location: Option<Regex>,
    given_names: HashSet<String>,
    org_suffixes: HashSet<String>,
    stopwords: HashSet<String>,
}

impl EntityModel {
    pub fn load(source: LexiconSource) -> Result<Self, Unavailable> {
        let raw = match &source {
            LexiconSource::Builtin => BUILTIN_LEXICON.to_string(),
            LexiconSource::Path(path) => std::fs::read_to_string(path).map_err(|e| {
                Unavailable::new(
                    Capability::EntityModel,
                    format!("cannot read lexicon {}: {}", path.display(), e),
                )
            })?,
        };

        let lexicon: Lexicon = serde_json::from_str(&raw).map_err(|e| {
            Unavailable::new(Capability::EntityModel, format!("invalid lexicon: {}", e))
        })?;

        let model = Self::compile(&lexicon)?;
        log::info!(
            "[Entities] lexicon {} loaded: {} given names, {} locations",
            lexicon.version,
            model.given_names.len(),
            lexicon.locations.len()
        );
        Ok(model)
    }

    fn compile(lexicon: &Lexicon) -> Result<Self, Unavailable> {
        let build = |pattern: Option<String>| -> Result<Option<Regex>, Unavailable> {
            match pattern {
                Some(p) => Regex::new(&p).map(Some).map_err(|e| {
                    Unavailable::new(Capability::EntityModel, format!("bad pattern: {}", e))
                }),
                None => Ok(None),
            }
        };

        let name = format!(r"{WORD}(?:[ \t]+{WORD}){{0,2}}");

        let honorific = build(
            alternation(&lexicon.honorifics)
                .map(|alt| format!(r"\b(?:{alt})\.?[ \t]+({name})")),
        )?;
        let cue = build(
            alternation(&lexicon.person_cues)
                .map(|alt| format!(r"\b(?i:{alt})[ \t]*[:-][ \t]*({name})")),
        )?;
        let org_prefix = build(
            alternation(&lexicon.org_prefixes)
                .map(|alt| format!(r"\b(?:{alt})[ \t]+{WORD}(?:[ \t]+{WORD})*")),
        )?;
        let location = build(alternation(&lexicon.locations).map(|alt| format!(r"\b(?:{alt})\b")))?;

        Ok(Self {
            honorific,
            cue,
            org_prefix,
            location,
            given_names: lexicon.given_names.iter().map(|s| s.trim().to_string()).collect(),
            org_suffixes: lexicon
                .org_suffixes
                .iter()
                .map(|s| s.trim().trim_end_matches('.').to_lowercase())
                .collect(),
            stopwords: lexicon.stopwords.iter().map(|s| s.trim().to_string()).collect(),
        })
    }

    /// Runs the recognizer once over `text`.
    ///
    /// Spans never overlap; organisations claim text first, then people,
    /// then locations. Results are ordered by position. Text that is reliably
    /// identified as non-English yields nothing.
    pub fn recognize(&self, text: &str) -> Vec<TextMatch> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        if let Some(info) = whatlang::detect(text) {
            if info.is_reliable() && info.lang() != Lang::Eng {
                log::info!(
                    "[Entities] skipped: text detected as {} ({:.2})",
                    info.lang().eng_name(),
                    info.confidence()
                );
                return Vec::new();
            }
        }

        let runs = self.capitalized_runs(text);
        let mut claimed = Claims::default();

        // Organisations
        if let Some(re) = &self.org_prefix {
            for m in re.find_iter(text) {
                claimed.offer(Label::Organization, text, m.range());
            }
        }
        for run in &runs {
            if let Some(span) = self.org_by_suffix(text, run) {
                claimed.offer(Label::Organization, text, span);
            }
        }

        // People
        for re in [&self.honorific, &self.cue].into_iter().flatten() {
            for caps in re.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    if let Some(span) = self.cut_at_stopword(text, m.range()) {
                        claimed.offer(Label::Person, text, span);
                    }
                }
            }
        }
        for run in &runs {
            if let Some(span) = self.person_by_given_name(text, run) {
                claimed.offer(Label::Person, text, span);
            }
        }

        // Locations
        if let Some(re) = &self.location {
            for m in re.find_iter(text) {
                claimed.offer(Label::Location, text, m.range());
            }
        }

        let found = claimed.into_sorted();
        log::debug!("[Entities] {} entities", found.len());
        found
    }

    fn capitalized_runs(&self, text: &str) -> Vec<Vec<Range<usize>>> {
        let (Some(run_re), Some(word_re)) = (CAPITALIZED_RUN.as_ref(), WORD_TOKEN.as_ref()) else {
            return Vec::new();
        };
        run_re
            .find_iter(text)
            .map(|run| {
                word_re
                    .find_iter(run.as_str())
                    .map(|w| run.start() + w.start()..run.start() + w.end())
                    .collect()
            })
            .collect()
    }

    /// `Acme Health Corp` style runs; leading stopwords are dropped.
    fn org_by_suffix(&self, text: &str, run: &[Range<usize>]) -> Option<Range<usize>> {
        let last = run.last()?;
        if !self.org_suffixes.contains(&text[last.clone()].to_lowercase()) {
            return None;
        }
        let first = run
            .iter()
            .position(|w| !self.stopwords.contains(&text[w.clone()]))?;
        // The suffix alone is not a name.
        if first + 1 >= run.len() {
            return None;
        }
        Some(run[first].start..last.end)
    }

    fn person_by_given_name(&self, text: &str, run: &[Range<usize>]) -> Option<Range<usize>> {
        let first = run
            .iter()
            .position(|w| self.given_names.contains(&text[w.clone()]))?;
        let tokens: Vec<&Range<usize>> = run[first..]
            .iter()
            .take(3)
            .take_while(|w| !self.stopwords.contains(&text[(*w).clone()]))
            .collect();
        if tokens.len() < 2 {
            return None;
        }
        Some(tokens[0].start..tokens[tokens.len() - 1].end)
    }

    /// Shortens a span so it stops before the first stopword token.
    fn cut_at_stopword(&self, text: &str, span: Range<usize>) -> Option<Range<usize>> {
        let word_re = WORD_TOKEN.as_ref()?;
        let slice = &text[span.clone()];
        let mut end = span.start;
        for w in word_re.find_iter(slice) {
            if self.stopwords.contains(w.as_str()) {
                break;
            }
            end = span.start + w.end();
        }
        (end > span.start).then(|| span.start..end)
    }
}

/// Non-overlapping span collector; earlier offers win.
#[derive(Default)]
struct Claims {
    taken: Vec<TextMatch>,
}

impl Claims {
    fn offer(&mut self, label: Label, text: &str, span: Range<usize>) {
        if span.is_empty() {
            return;
        }
        let overlaps = self
            .taken
            .iter()
            .any(|t| t.span.start < span.end && span.start < t.span.end);
        if !overlaps {
            self.taken
                .push(TextMatch::new(label, &text[span.clone()], span));
        }
    }

    fn into_sorted(mut self) -> Vec<TextMatch> {
        self.taken.sort_by_key(|t| t.span.start);
        self.taken
    }
}

/// `a|b|c` of escaped, non-empty entries, longest first.
fn alternation(words: &[String]) -> Option<String> {
    let mut words: Vec<&str> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    Some(
        words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

// ============================================================================
// Extraction
// ============================================================================

/// Entity findings for one page, aligned onto `lines`.
///
/// Returns nothing when disabled, when no model is available, or for empty
/// text.
pub fn extract_entities(
    model: Option<&EntityModel>,
    text: &str,
    lines: &[OcrLine],
    enabled: bool,
) -> Vec<Finding> {
    if !enabled || text.is_empty() {
        return Vec::new();
    }
    let Some(model) = model else {
        return Vec::new();
    };
    align_findings(model.recognize(text), lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn model() -> EntityModel {
        EntityModel::load(LexiconSource::Builtin).unwrap()
    }

    fn pairs(found: &[TextMatch]) -> Vec<(Label, &str)> {
        found.iter().map(|f| (f.label, f.matched.as_str())).collect()
    }

    #[test]
    fn test_builtin_lexicon_loads() {
        let m = model();
        assert!(m.honorific.is_some());
        assert!(m.location.is_some());
        assert!(m.given_names.contains("Jane"));
        assert!(m.org_suffixes.contains("inc"));
    }

    #[test]
    fn test_recognize_sentence() {
        let found = model().recognize("Dr. Jane Doe works at Acme Corp in New York.");
        assert_eq!(
            pairs(&found),
            vec![
                (Label::Person, "Jane Doe"),
                (Label::Organization, "Acme Corp"),
                (Label::Location, "New York"),
            ]
        );
    }

    #[test]
    fn test_field_cue_stops_at_next_field() {
        let found = model().recognize("Patient Name: Ravi Kumar Date: 01/02/2020");
        assert_eq!(pairs(&found), vec![(Label::Person, "Ravi Kumar")]);
    }

    #[test]
    fn test_org_prefix_claims_before_location() {
        let found = model().recognize("Account held with State Bank of India since 2019");
        assert_eq!(
            pairs(&found),
            vec![(Label::Organization, "State Bank of India")]
        );
    }

    #[test]
    fn test_non_english_text_skipped() {
        let text = "Der Patient wurde gestern in das Krankenhaus gebracht und bleibt dort \
                    für weitere Untersuchungen, sagte der behandelnde Arzt aus Berlin heute.";
        assert!(model().recognize(text).is_empty());
    }

    #[test]
    fn test_lexicon_from_path() {
        let path = std::env::temp_dir().join(format!("deid_lexicon_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"version":"t","locations":["Atlantis"],"givenNames":[]}"#,
        )
        .unwrap();
        let m = EntityModel::load(LexiconSource::Path(path.clone())).unwrap();
        let found = m.recognize("Shipped to Atlantis last week");
        assert_eq!(pairs(&found), vec![(Label::Location, "Atlantis")]);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_or_bad_lexicon_unavailable() {
        let err = EntityModel::load(LexiconSource::Path("/nonexistent/lexicon.json".into()))
            .unwrap_err();
        assert_eq!(err.capability, Capability::EntityModel);

        let path = std::env::temp_dir().join(format!("deid_bad_lexicon_{}.json", std::process::id()));
        std::fs::write(&path, "not json").unwrap();
        assert!(EntityModel::load(LexiconSource::Path(path.clone())).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_extract_entities_aligns_and_gates() {
        let lines = vec![
            OcrLine::new("Dr. Jane Doe works at", BBox::new(10, 10, 300, 20), 0.9),
            OcrLine::new("Acme Corp in New York.", BBox::new(10, 40, 300, 20), 0.9),
        ];
        let text = "Dr. Jane Doe works at\nAcme Corp in New York.";
        let m = model();

        let found = extract_entities(Some(&m), text, &lines, true);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].label(), Label::Person);
        assert_eq!(found[0].bbox(), lines[0].bbox);
        assert_eq!(found[1].bbox(), lines[1].bbox);
        assert_eq!(found[2].bbox(), lines[1].bbox);

        assert!(extract_entities(Some(&m), text, &lines, false).is_empty());
        assert!(extract_entities(None, text, &lines, true).is_empty());
        assert!(extract_entities(Some(&m), "", &lines, true).is_empty());
    }
}
