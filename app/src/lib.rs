//! De-identification pipeline: ingestion, detection, selection, redaction
//! and output for a batch of documents.

pub mod config;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod select;
pub mod services;

pub use config::{apply_env_overrides, load_config, save_config, ConfigError, DeidConfig};
pub use ingest::{load_pages, IngestError, IngestOptions};
pub use output::{write_outputs, OutputPaths};
pub use pipeline::{
    detect, process_page, recognize_lines, run_batch, BatchOutput, DetectOptions, SkippedUnit,
};
pub use select::{AutoSelect, FindingSelector, PromptSelect};
pub use services::{ServiceSettings, Services};
