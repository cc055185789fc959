//! Output types produced by an extraction.
//!
//! [`ClassificationResult`] is the document the CLI prints: exactly the keys
//! `tipo` and `conteudo`. [`ExtractionOutput`] wraps it with the extraction
//! method, per-page OCR results and timings for library callers.

use crate::classify::DocumentType;
use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Final pipeline result: the inferred type and the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Inferred document type.
    pub tipo: DocumentType,
    /// Normalized extracted text.
    pub conteudo: String,
}

impl ClassificationResult {
    /// Pretty JSON with 4-space indentation; non-ASCII characters are written
    /// literally, not as `\u` escapes.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only emits valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Where the text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded text layer; OCR was skipped.
    Direct,
    /// Rendered pages recognised by the OCR engine.
    Ocr,
}

/// Recognition result for a single OCR page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Raw recognised text; empty when `error` is set.
    pub text: String,
    /// Wall-clock time for preprocessing plus recognition.
    pub duration_ms: u64,
    /// Set when the page failed or timed out.
    pub error: Option<PageError>,
}

/// Timing and page counts for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages rendered for OCR (0 on the direct path).
    pub ocr_pages: usize,
    /// OCR pages that failed or timed out.
    pub failed_pages: usize,
    pub direct_duration_ms: u64,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything an extraction produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub result: ClassificationResult,
    pub method: ExtractionMethod,
    /// Per-page OCR results in page order; empty on the direct path.
    pub pages: Vec<PageText>,
    pub stats: ExtractionStats,
}
