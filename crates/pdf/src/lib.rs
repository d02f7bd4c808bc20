//! PDF input and output.
//!
//! Input pages are rasterized with pdfium so the rest of the pipeline only
//! ever sees pixels. Output is rebuilt from the redacted images with lopdf:
//! no text layer from the source survives.

pub mod export;
pub mod render;

pub use export::export_images_to_pdf;
pub use render::{bind_pdfium, PdfDocument, DEFAULT_DPI, DEFAULT_MAX_PX};
