//! OCR error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to launch tesseract: {0}")]
    Launch(String),

    #[error("tesseract exited with an error: {0}")]
    Failed(String),

    #[error("image processing failed: {0}")]
    ImageProcess(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
