//! Choosing which findings get redacted.

use deid_core::{mask_snippet, Finding, PageImage};
use std::io::{BufRead, Write};

pub trait FindingSelector {
    /// Findings of `page` to redact, in the order given.
    fn select(&mut self, page: &PageImage, findings: &[Finding]) -> Vec<Finding>;
}

/// Redacts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoSelect;

impl FindingSelector for AutoSelect {
    fn select(&mut self, _page: &PageImage, findings: &[Finding]) -> Vec<Finding> {
        findings.to_vec()
    }
}

/// Asks once per finding on `output`, reading answers from `input`.
///
/// Anything other than `n`/`no` keeps the finding, so an empty answer or a
/// closed input redacts.
pub struct PromptSelect<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelect<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> std::io::Result<bool> {
        write!(self.output, "{} [Y/n] ", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(true);
        }
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer != "n" && answer != "no")
    }
}

/// One-line description; matched text is masked.
pub fn describe(finding: &Finding) -> String {
    let place = if finding.is_located() {
        finding.bbox().to_string()
    } else {
        "not located".to_string()
    };
    match finding.matched() {
        Some(text) => format!("{} \"{}\" at {}", finding.label(), mask_snippet(text), place),
        None => format!("{} at {}", finding.label(), place),
    }
}

impl<R: BufRead, W: Write> FindingSelector for PromptSelect<R, W> {
    fn select(&mut self, page: &PageImage, findings: &[Finding]) -> Vec<Finding> {
        let mut selected = Vec::with_capacity(findings.len());

        for finding in findings {
            let question = format!("[{}] redact {}?", page.label(), describe(finding));
            let keep = self.ask(&question).unwrap_or_else(|e| {
                log::warn!("[Pipeline] prompt failed ({}), keeping finding", e);
                true
            });
            if keep {
                selected.push(finding.clone());
            }
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deid_core::{BBox, Label};
    use image::RgbImage;
    use std::io::Cursor;

    fn findings() -> Vec<Finding> {
        vec![
            Finding::text(Label::Email, "jane@example.com", BBox::new(1, 2, 3, 4)),
            Finding::region(Label::Face, BBox::new(5, 6, 7, 8)),
            Finding::text(Label::Person, "Jane Doe", BBox::UNLOCATED),
        ]
    }

    fn page() -> PageImage {
        PageImage::new("scan.png", "", RgbImage::new(1, 1))
    }

    #[test]
    fn test_auto_selects_all() {
        assert_eq!(AutoSelect.select(&page(), &findings()), findings());
    }

    #[test]
    fn test_prompt_answers() {
        let mut out = Vec::new();
        let mut prompt = PromptSelect::new(Cursor::new("y\nno\n\n"), &mut out);
        let chosen = prompt.select(&page(), &findings());
        assert_eq!(chosen.len(), 2);
        assert_eq!(chosen[0].label(), Label::Email);
        assert_eq!(chosen[1].label(), Label::Person);

        let shown = String::from_utf8(out).unwrap();
        assert_eq!(shown.matches("[Y/n]").count(), 3);
        assert!(!shown.contains("jane@example.com"));
        assert!(shown.contains("not located"));
    }

    #[test]
    fn test_prompt_closed_input_defaults_to_yes() {
        let mut prompt = PromptSelect::new(Cursor::new(""), Vec::new());
        assert_eq!(prompt.select(&page(), &findings()).len(), 3);
    }
}
