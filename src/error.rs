//! Error types for the fiscaldoc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] is **fatal**: the extraction cannot produce a result
//!   (missing input file, no text from either the text layer or OCR).
//!   Returned as `Err(ExtractError)` from the top-level `extract*` functions.
//!
//! * [`PageError`] is **non-fatal**: a single page could not be recognised
//!   but the other pages are fine. Stored inside
//!   [`crate::output::PageText`]; the page contributes an empty string to the
//!   assembled text.
//!
//! Collaborator failures ([`TextLayerError`], [`RenderError`], [`OcrError`])
//! never leave the orchestrator: it logs them and either falls back to OCR or
//! reports [`ExtractError::NoTextExtracted`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fiscaldoc library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Neither the embedded text layer nor OCR produced any text.
    #[error("No text could be extracted from '{path}'")]
    NoTextExtracted { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single OCR page.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The OCR engine failed on this page.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// Recognition did not finish within the per-page timeout.
    #[error("Page {page}: recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

/// Failure reading the embedded text layer.
#[derive(Debug, Error)]
pub enum TextLayerError {
    #[error("Cannot open PDF '{path}': {detail}")]
    Open { path: PathBuf, detail: String },

    #[error("Cannot read text of page {page}: {detail}")]
    Page { page: u32, detail: String },
}

/// Failure rasterising pages.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The pdfium library could not be loaded.
    #[error("Failed to bind to pdfium library{}: {detail}", library_location(.path))]
    RendererUnavailable {
        path: Option<PathBuf>,
        detail: String,
    },

    #[error("PDF '{path}' could not be loaded for rendering: {detail}")]
    LoadFailed { path: PathBuf, detail: String },

    #[error("Rasterisation failed for page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    #[error("Render task failed: {0}")]
    Task(String),
}

fn library_location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" at '{}'", p.display()))
        .unwrap_or_default()
}

/// Errors from the OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineUnavailable(String),

    #[error("OCR failed: {0}")]
    RecognitionFailed(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
