//! Direct extraction: read the embedded text layer of a PDF.
//!
//! Uses `lopdf`, which parses the file in pure Rust; no native library is
//! needed to decide whether OCR can be skipped. The document is owned by
//! [`read_pages`] and dropped before it returns on every path.

use crate::error::TextLayerError;
use crate::pipeline::normalize::normalize;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

/// Reader for a PDF's embedded text.
///
/// Implemented by [`LopdfTextLayer`]; tests substitute fakes to drive the
/// orchestrator without real files.
pub trait TextLayerReader: Send + Sync {
    /// Text of every page, in page order.
    fn read_pages(&self, pdf_path: &Path) -> Result<Vec<String>, TextLayerError>;
}

/// The default text-layer reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfTextLayer;

impl TextLayerReader for LopdfTextLayer {
    fn read_pages(&self, pdf_path: &Path) -> Result<Vec<String>, TextLayerError> {
        let document = Document::load(pdf_path).map_err(|e| TextLayerError::Open {
            path: pdf_path.to_path_buf(),
            detail: e.to_string(),
        })?;

        // get_pages() is keyed by 1-based page number, ascending.
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("Text layer: {} pages in {}", page_numbers.len(), pdf_path.display());

        page_numbers
            .into_iter()
            .map(|page| {
                document
                    .extract_text(&[page])
                    .map_err(|e| TextLayerError::Page {
                        page,
                        detail: e.to_string(),
                    })
            })
            .collect()
    }
}

/// Concatenate the text of every page (no separator) and normalize it.
///
/// Returns an empty string when the file cannot be read; an empty result is
/// the orchestrator's signal to fall back to OCR.
pub fn extract_direct(reader: &dyn TextLayerReader, pdf_path: &Path) -> String {
    match reader.read_pages(pdf_path) {
        Ok(pages) => normalize(&pages.concat()),
        Err(e) => {
            warn!("Direct text extraction failed: {}", e);
            String::new()
        }
    }
}
