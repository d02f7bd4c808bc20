//! Redaction log entries
//!
//! One entry per processed page. Entries are immutable once built and are
//! archived as a JSON array next to the redacted output.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::types::{Finding, RedactionMode};

/// Timestamp layout used in log entries and output file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionLogEntry {
    file: String,
    page_tag: String,
    detections: Vec<Finding>,
    redacted: Vec<Finding>,
    mode: RedactionMode,
    timestamp: String,
}

impl RedactionLogEntry {
    pub fn new(
        file: impl Into<String>,
        page_tag: impl Into<String>,
        detections: Vec<Finding>,
        redacted: Vec<Finding>,
        mode: RedactionMode,
    ) -> Self {
        Self::at(file, page_tag, detections, redacted, mode, Local::now())
    }

    pub fn at(
        file: impl Into<String>,
        page_tag: impl Into<String>,
        detections: Vec<Finding>,
        redacted: Vec<Finding>,
        mode: RedactionMode,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            file: file.into(),
            page_tag: page_tag.into(),
            detections,
            redacted,
            mode,
            timestamp: format_timestamp(at),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn page_tag(&self) -> &str {
        &self.page_tag
    }

    /// Everything the detectors reported, located or not.
    pub fn detections(&self) -> &[Finding] {
        &self.detections
    }

    /// The subset chosen for redaction.
    pub fn redacted(&self) -> &[Finding] {
        &self.redacted
    }

    pub fn mode(&self) -> RedactionMode {
        self.mode
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}
