//! Extraction entry points: one document in, one [`ExtractionOutput`] out.
//!
//! ```text
//! START → direct text ─┬─ non-empty ──────────────────────────────→ classify → DONE
//!                      └─ empty → render ─┬─ no pages → NoTextExtracted
//!                                         └─ pages → preprocess + OCR → classify → DONE
//! ```
//!
//! Collaborator failures are logged here and decide the branch; only
//! [`ExtractError`] leaves this module.

use crate::classify::Classifier;
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ClassificationResult, ExtractionMethod, ExtractionOutput, ExtractionStats};
use crate::pipeline::ocr::{self, OcrEngine, TesseractEngine};
use crate::pipeline::render::{self, PageRenderer, PdfiumRenderer};
use crate::pipeline::text_layer::{self, LopdfTextLayer, TextLayerReader};
use crate::pipeline::input;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The external collaborators an extraction talks to.
///
/// [`Collaborators::from_config`] wires the real implementations; tests and
/// embedders can swap any of them.
#[derive(Clone)]
pub struct Collaborators {
    pub text_layer: Arc<dyn TextLayerReader>,
    pub renderer: Arc<dyn PageRenderer>,
    /// If None, a [`TesseractEngine`] is created from the config when OCR
    /// is first needed.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl Collaborators {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            text_layer: Arc::new(LopdfTextLayer),
            renderer: Arc::new(PdfiumRenderer::from_config(config)),
            ocr_engine: config.ocr_engine.clone(),
        }
    }
}

/// Extract, normalize and classify the text of a PDF file.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`ExtractError::FileNotFound`] / [`ExtractError::PermissionDenied`]
///   for a bad input path
/// - [`ExtractError::NoTextExtracted`] when the text layer is empty and OCR
///   produced nothing (renderer unavailable, engine unavailable, or every
///   page blank or failed)
pub async fn extract(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    extract_with(input_path, config, &Collaborators::from_config(config)).await
}

/// [`extract`] with explicit collaborators.
pub async fn extract_with(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
    collaborators: &Collaborators,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let pdf_path = input::resolve_input(input_path)?;
    info!("Starting extraction: {}", pdf_path.display());

    let classifier = Classifier::for_profile(config.classifier);
    let mut stats = ExtractionStats::default();

    // ── Step 1: Embedded text layer ──────────────────────────────────────
    let direct_start = Instant::now();
    let reader = Arc::clone(&collaborators.text_layer);
    let path = pdf_path.clone();
    let direct_text = tokio::task::spawn_blocking(move || {
        text_layer::extract_direct(reader.as_ref(), &path)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Text layer task panicked: {}", e)))?;
    stats.direct_duration_ms = direct_start.elapsed().as_millis() as u64;

    if !direct_text.is_empty() {
        info!(
            "Text layer: {} chars in {}ms, OCR skipped",
            direct_text.chars().count(),
            stats.direct_duration_ms
        );
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        return Ok(ExtractionOutput {
            result: ClassificationResult {
                tipo: classifier.classify(&direct_text),
                conteudo: direct_text,
            },
            method: ExtractionMethod::Direct,
            pages: Vec::new(),
            stats,
        });
    }

    info!("Text layer empty, falling back to OCR");

    // ── Step 2: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let images = match render::render_pages(
        Arc::clone(&collaborators.renderer),
        &pdf_path,
        config.dpi,
    )
    .await
    {
        Ok(images) => images,
        Err(e) => {
            warn!("Page rendering failed: {}", e);
            Vec::new()
        }
    };
    stats.render_duration_ms = render_start.elapsed().as_millis() as u64;

    if images.is_empty() {
        return Err(ExtractError::NoTextExtracted { path: pdf_path });
    }
    debug!("Rendered {} pages in {}ms", images.len(), stats.render_duration_ms);

    // ── Step 3: OCR engine, once per extraction ──────────────────────────
    let engine = match resolve_engine(collaborators, config).await {
        Ok(engine) => engine,
        Err(e) => {
            warn!("OCR unavailable: {}", e);
            return Err(ExtractError::NoTextExtracted { path: pdf_path });
        }
    };

    // ── Step 4: Preprocess + recognise ───────────────────────────────────
    let ocr_start = Instant::now();
    let recognition = ocr::recognize_pages(engine, images, config).await;
    stats.ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
    stats.ocr_pages = recognition.pages.len();
    stats.failed_pages = recognition.pages.iter().filter(|p| p.error.is_some()).count();

    if recognition.text.is_empty() {
        warn!(
            "OCR produced no text ({}/{} pages failed)",
            stats.failed_pages, stats.ocr_pages
        );
        return Err(ExtractError::NoTextExtracted { path: pdf_path });
    }

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "OCR complete: {} chars from {} pages ({} failed), {}ms total",
        recognition.text.chars().count(),
        stats.ocr_pages,
        stats.failed_pages,
        stats.total_duration_ms
    );

    Ok(ExtractionOutput {
        result: ClassificationResult {
            tipo: classifier.classify(&recognition.text),
            conteudo: recognition.text,
        },
        method: ExtractionMethod::Ocr,
        pages: recognition.pages,
        stats,
    })
}

/// Extract and write the JSON result directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let output = extract(input_path, config).await?;

    let json = output
        .result
        .to_json_pretty()
        .map_err(|e| ExtractError::Internal(format!("JSON serialisation failed: {e}")))?;

    write_json_atomic(output_path.as_ref(), &json).await?;
    Ok(output)
}

/// Write `json` to `<path>.json.tmp`, then rename it over `path`. The temp
/// file is removed if either step fails.
async fn write_json_atomic(path: &Path, json: &str) -> Result<(), ExtractError> {
    let write_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let written = match tokio::fs::write(&tmp_path, json.as_bytes()).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_path, config))
}

/// Extract from PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] which is removed when
/// this function returns.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    extract(tmp.path(), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Use the injected engine, or start tesseract from the config.
async fn resolve_engine(
    collaborators: &Collaborators,
    config: &ExtractionConfig,
) -> Result<Arc<dyn OcrEngine>, crate::error::OcrError> {
    if let Some(ref engine) = collaborators.ocr_engine {
        return Ok(Arc::clone(engine));
    }

    let binary = config.tesseract_path.clone();
    let languages = config.language_arg();
    let engine = tokio::task::spawn_blocking(move || TesseractEngine::new(binary, languages))
        .await
        .map_err(|e| {
            crate::error::OcrError::EngineUnavailable(format!("engine task panicked: {e}"))
        })??;

    Ok(Arc::new(engine))
}
