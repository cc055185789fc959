//! # fiscaldoc
//!
//! Extract, normalize and classify the text of Brazilian fiscal PDFs
//! (NF-e, NFS-e, NFC-e, NF3-e, CT-e, boletos and faturas).
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate the local file
//!  ├─ 2. Text layer embedded text via lopdf; OCR is skipped when non-empty
//!  ├─ 3. Render     rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 4. Preprocess grayscale + Otsu binarization
//!  ├─ 5. OCR        concurrent tesseract calls, joined in page order
//!  ├─ 6. Normalize  strip accents, rejoin "R$" breaks, collapse whitespace
//!  └─ 7. Classify   first matching pattern wins
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fiscaldoc::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract("nota.pdf", &config).await?;
//!     println!("{}", output.result.to_json_pretty()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `extract_text` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! Documents with a text layer need nothing beyond this crate. The OCR
//! fallback needs the pdfium shared library and the `tesseract` binary with
//! the `por` and `eng` language packs.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use classify::{Classifier, DocumentType};
pub use config::{ClassifierProfile, ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ExtractError, OcrError, PageError, RenderError, TextLayerError};
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, extract_with, Collaborators,
};
pub use output::{ClassificationResult, ExtractionMethod, ExtractionOutput, ExtractionStats, PageText};
pub use pipeline::normalize::normalize;
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use pipeline::text_layer::{LopdfTextLayer, TextLayerReader};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
