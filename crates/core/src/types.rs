//! Shared data model
//!
//! Boxes, OCR lines, finding labels and the `Finding` variants that flow from
//! the detectors through alignment into redaction and the audit log.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use crate::CoreError;

// ============================================================================
// Boxes
// ============================================================================

/// Pixel rectangle `(x, y, width, height)`.
///
/// Serialized as a four-element array `[x, y, w, h]`, which is the layout
/// archived in redaction logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    /// Sentinel for findings that could not be placed on the page.
    pub const UNLOCATED: BBox = BBox {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box is located when it covers at least one pixel.
    pub fn is_located(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        let x0 = (self.x as i64).min(other.x as i64);
        let y0 = (self.y as i64).min(other.y as i64);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        BBox::new(
            x0 as i32,
            y0 as i32,
            (x1 - x0).min(i32::MAX as i64) as i32,
            (y1 - y0).min(i32::MAX as i64) as i32,
        )
    }

    /// Axis-aligned bounds of a point set; `None` for an empty set.
    pub fn from_points<I>(points: I) -> Option<BBox>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = points.into_iter();
        let (fx, fy) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (fx, fy, fx, fy);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(BBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

impl From<[i32; 4]> for BBox {
    fn from(v: [i32; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [i32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} ({}x{})", self.x, self.y, self.width, self.height)
    }
}

// ============================================================================
// OCR lines
// ============================================================================

/// One line of recognized text, as produced by the OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BBox,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, bbox: BBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Finding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Email,
    Phone,
    Aadhaar,
    Pan,
    Gstin,
    Ifsc,
    Ssn,
    Npi,
    Passport,
    DlGeneric,
    CreditCard,
    Cvv,
    BankAcc,
    Dob,
    #[serde(rename = "ICD10")]
    Icd10,
    Ip,
    Mac,
    Url,
    InsuranceId,
    Address,
    Person,
    Organization,
    Location,
    Face,
    Signature,
    #[serde(rename = "QRCODE")]
    QrCode,
}

/// What a label's findings carry besides their box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Matched page text (patterns, address heuristic, entities).
    Text,
    /// Pixels only.
    Region,
    /// Decoded machine-readable payload.
    Symbol,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Email => "EMAIL",
            Label::Phone => "PHONE",
            Label::Aadhaar => "AADHAAR",
            Label::Pan => "PAN",
            Label::Gstin => "GSTIN",
            Label::Ifsc => "IFSC",
            Label::Ssn => "SSN",
            Label::Npi => "NPI",
            Label::Passport => "PASSPORT",
            Label::DlGeneric => "DL_GENERIC",
            Label::CreditCard => "CREDIT_CARD",
            Label::Cvv => "CVV",
            Label::BankAcc => "BANK_ACC",
            Label::Dob => "DOB",
            Label::Icd10 => "ICD10",
            Label::Ip => "IP",
            Label::Mac => "MAC",
            Label::Url => "URL",
            Label::InsuranceId => "INSURANCE_ID",
            Label::Address => "ADDRESS",
            Label::Person => "PERSON",
            Label::Organization => "ORGANIZATION",
            Label::Location => "LOCATION",
            Label::Face => "FACE",
            Label::Signature => "SIGNATURE",
            Label::QrCode => "QRCODE",
        }
    }

    pub fn kind(&self) -> LabelKind {
        match self {
            Label::Face | Label::Signature => LabelKind::Region,
            Label::QrCode => LabelKind::Symbol,
            _ => LabelKind::Text,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Findings
// ============================================================================

/// Text hit before spatial alignment.
///
/// `span` is a byte range into the text the match came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub label: Label,
    pub matched: String,
    pub span: Range<usize>,
}

impl TextMatch {
    pub fn new(label: Label, matched: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            label,
            matched: matched.into(),
            span,
        }
    }
}

/// A located (or sentinel-boxed) finding on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "FindingRecord", try_from = "FindingRecord")]
pub enum Finding {
    /// Text hit placed on an OCR line. Unaligned hits keep [`BBox::UNLOCATED`].
    Text {
        label: Label,
        matched: String,
        bbox: BBox,
    },
    /// Pixel-only region such as a face or a signature.
    Region { label: Label, bbox: BBox },
    /// Decoded symbol (QR code) with its payload.
    Symbol {
        label: Label,
        payload: String,
        bbox: BBox,
    },
}

impl Finding {
    pub fn text(label: Label, matched: impl Into<String>, bbox: BBox) -> Self {
        Finding::Text {
            label,
            matched: matched.into(),
            bbox,
        }
    }

    pub fn region(label: Label, bbox: BBox) -> Self {
        Finding::Region { label, bbox }
    }

    pub fn qr_code(payload: impl Into<String>, bbox: BBox) -> Self {
        Finding::Symbol {
            label: Label::QrCode,
            payload: payload.into(),
            bbox,
        }
    }

    pub fn label(&self) -> Label {
        match self {
            Finding::Text { label, .. }
            | Finding::Region { label, .. }
            | Finding::Symbol { label, .. } => *label,
        }
    }

    pub fn bbox(&self) -> BBox {
        match self {
            Finding::Text { bbox, .. } | Finding::Region { bbox, .. } | Finding::Symbol { bbox, .. } => {
                *bbox
            }
        }
    }

    /// Matched text or decoded payload, if the finding carries one.
    pub fn matched(&self) -> Option<&str> {
        match self {
            Finding::Text { matched, .. } => Some(matched),
            Finding::Symbol { payload, .. } => Some(payload),
            Finding::Region { .. } => None,
        }
    }

    pub fn is_located(&self) -> bool {
        self.bbox().is_located()
    }
}

/// Flat wire form of a [`Finding`] used in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FindingRecord {
    label: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matched: Option<String>,
    #[serde(rename = "box")]
    bbox: BBox,
}

impl From<Finding> for FindingRecord {
    fn from(finding: Finding) -> Self {
        match finding {
            Finding::Text {
                label,
                matched,
                bbox,
            } => FindingRecord {
                label,
                matched: Some(matched),
                bbox,
            },
            Finding::Region { label, bbox } => FindingRecord {
                label,
                matched: None,
                bbox,
            },
            Finding::Symbol {
                label,
                payload,
                bbox,
            } => FindingRecord {
                label,
                matched: Some(payload),
                bbox,
            },
        }
    }
}

impl TryFrom<FindingRecord> for Finding {
    type Error = CoreError;

    fn try_from(record: FindingRecord) -> Result<Self, Self::Error> {
        let FindingRecord {
            label,
            matched,
            bbox,
        } = record;
        match (label.kind(), matched) {
            (LabelKind::Text, Some(matched)) => Ok(Finding::Text {
                label,
                matched,
                bbox,
            }),
            (LabelKind::Symbol, Some(payload)) => Ok(Finding::Symbol {
                label,
                payload,
                bbox,
            }),
            (LabelKind::Region, _) => Ok(Finding::Region { label, bbox }),
            (_, None) => Err(CoreError::InvalidFinding(format!(
                "{} finding without matched text",
                label
            ))),
        }
    }
}

// ============================================================================
// Redaction mode
// ============================================================================

/// How selected regions are obscured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    /// Region-local Gaussian blur, strength scaled with region width.
    #[default]
    Blur,
    /// Solid opaque fill.
    #[serde(alias = "fill")]
    Black,
}

impl fmt::Display for RedactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactionMode::Blur => write!(f, "blur"),
            RedactionMode::Black => write!(f, "black"),
        }
    }
}

impl std::str::FromStr for RedactionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(RedactionMode::Blur),
            "black" | "fill" => Ok(RedactionMode::Black),
            other => Err(CoreError::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(10, 20, 30, 40)).unwrap();
        assert_eq!(json, "[10,20,30,40]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BBox::new(10, 20, 30, 40));
    }

    #[test]
    fn test_bbox_located() {
        assert!(!BBox::UNLOCATED.is_located());
        assert!(!BBox::new(5, 5, 0, 10).is_located());
        assert!(!BBox::new(5, 5, -3, 10).is_located());
        assert!(BBox::new(5, 5, 1, 1).is_located());
    }

    #[test]
    fn test_bbox_union_and_points() {
        let a = BBox::new(10, 10, 20, 10);
        let b = BBox::new(40, 5, 10, 10);
        assert_eq!(a.union(&b), BBox::new(10, 5, 40, 15));

        let pts = [(3, 9), (13, 2), (8, 4)];
        assert_eq!(BBox::from_points(pts), Some(BBox::new(3, 2, 10, 7)));
        assert_eq!(BBox::from_points(Vec::new()), None);
    }

    #[test]
    fn test_label_wire_names_match_as_str() {
        let labels = [
            Label::Email,
            Label::DlGeneric,
            Label::CreditCard,
            Label::BankAcc,
            Label::Icd10,
            Label::InsuranceId,
            Label::Organization,
            Label::QrCode,
        ];
        for label in labels {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
    }

    #[test]
    fn test_finding_wire_format() {
        let text = Finding::text(Label::Email, "jane@example.com", BBox::new(1, 2, 3, 4));
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["label"], "EMAIL");
        assert_eq!(value["matched"], "jane@example.com");
        assert_eq!(value["box"], serde_json::json!([1, 2, 3, 4]));

        let face = Finding::region(Label::Face, BBox::new(0, 0, 40, 40));
        let value = serde_json::to_value(&face).unwrap();
        assert!(value.get("matched").is_none());

        let qr = Finding::qr_code("https://example.com", BBox::new(5, 5, 50, 50));
        let back: Finding = serde_json::from_value(serde_json::to_value(&qr).unwrap()).unwrap();
        assert_eq!(back, qr);
    }

    #[test]
    fn test_text_finding_requires_matched() {
        let raw = r#"{"label":"EMAIL","box":[0,0,1,1]}"#;
        assert!(serde_json::from_str::<Finding>(raw).is_err());
    }

    #[test]
    fn test_redaction_mode_parse() {
        assert_eq!("blur".parse::<RedactionMode>().unwrap(), RedactionMode::Blur);
        assert_eq!("Black".parse::<RedactionMode>().unwrap(), RedactionMode::Black);
        assert_eq!("fill".parse::<RedactionMode>().unwrap(), RedactionMode::Black);
        assert!("pixelate".parse::<RedactionMode>().is_err());
        let mode: RedactionMode = serde_json::from_str("\"fill\"").unwrap();
        assert_eq!(mode, RedactionMode::Black);
        assert_eq!(serde_json::to_string(&RedactionMode::Black).unwrap(), "\"black\"");
    }
}
