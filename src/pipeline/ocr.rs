//! OCR stage: preprocess and recognise rendered pages concurrently.
//!
//! The engine is created once per extraction and shared by every page task
//! through an `Arc`. Preprocessing is CPU-bound and runs in `spawn_blocking`;
//! recognition is an async call so a per-page timeout can drop it, and
//! [`TesseractEngine`] kills its child process when that happens. At most
//! `config.concurrency` pages are in flight. Tasks finish in any order, so
//! each result carries its page index and the results are sorted before the
//! texts are joined.
//!
//! A failing or timed-out page never aborts the batch: it is logged, reported
//! through the progress callback, and contributes an empty string.

use crate::config::ExtractionConfig;
use crate::error::{OcrError, PageError};
use crate::output::PageText;
use crate::pipeline::normalize::normalize;
use crate::pipeline::preprocess::{encode_png, preprocess};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use image::{DynamicImage, GrayImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A text-recognition engine working on one preprocessed page at a time.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Recognise the text on a binarized page image.
    ///
    /// Dropping the returned future must stop the work; blocking calls
    /// belong in `spawn_blocking`.
    async fn recognize(&self, image: GrayImage) -> Result<String, OcrError>;
}

// ── Tesseract ────────────────────────────────────────────────────────────────

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    languages: String,
}

impl TesseractEngine {
    /// Probe the binary once and keep it for every page.
    ///
    /// Fails with [`OcrError::EngineUnavailable`] if the binary cannot be run.
    pub fn new(binary: impl Into<PathBuf>, languages: impl Into<String>) -> Result<Self, OcrError> {
        let binary = binary.into();
        let languages = languages.into();

        let output = std::process::Command::new(&binary)
            .arg("--version")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::EngineUnavailable(format!(
                        "'{}' not found (install tesseract-ocr with the por and eng language packs)",
                        binary.display()
                    ))
                } else {
                    OcrError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "'{} --version' exited with {}",
                binary.display(),
                output.status
            )));
        }

        debug!(
            "Tesseract ready: {} ({})",
            binary.display(),
            String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or("").trim()
        );

        Ok(Self { binary, languages })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, OcrError> {
        Self::new(&config.tesseract_path, config.language_arg())
    }

    async fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        // The child is killed if this future is dropped (page timeout).
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", self.languages.as_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(OcrError::RecognitionFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// Encode `image` into a PNG temp file, removed when the handle drops.
fn write_page_png(image: &GrayImage) -> Result<tempfile::NamedTempFile, OcrError> {
    let png = encode_png(image)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("fiscaldoc-page-")
        .suffix(".png")
        .tempfile()?;
    tmp.write_all(&png)?;
    tmp.flush()?;
    Ok(tmp)
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: GrayImage) -> Result<String, OcrError> {
        let tmp = tokio::task::spawn_blocking(move || write_page_png(&image))
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("PNG encode task panicked: {e}")))??;

        self.run(tmp.path()).await
    }
}

// ── Page recognition ─────────────────────────────────────────────────────────

/// Result of the OCR stage.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Page texts joined with a single space, then normalized.
    pub text: String,
    /// Per-page results in page order.
    pub pages: Vec<PageText>,
}

/// Recognise every page and assemble the document text in page order.
pub async fn recognize_pages(
    engine: Arc<dyn OcrEngine>,
    images: Vec<DynamicImage>,
    config: &ExtractionConfig,
) -> Recognition {
    let total_pages = images.len();
    info!(
        "OCR: {} pages with {} (concurrency {})",
        total_pages,
        engine.name(),
        config.concurrency
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_ocr_start(total_pages);
    }

    let mut pages: Vec<PageText> = stream::iter(images.into_iter().enumerate().map(|(idx, image)| {
        let engine = Arc::clone(&engine);
        let config = config.clone();
        async move {
            let page_num = idx + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, total_pages);
            }
            let result = recognize_page(engine, page_num, image, config.page_timeout_secs).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => cb.on_page_complete(page_num, total_pages, result.text.chars().count()),
                    Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    // Completion order is arbitrary.
    pages.sort_by_key(|p| p.page_num);

    let success = pages.iter().filter(|p| p.error.is_none()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_ocr_complete(total_pages, success);
    }

    let joined = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Recognition {
        text: normalize(&joined),
        pages,
    }
}

/// Preprocess and recognise one page. Never fails: errors become an empty
/// text plus a [`PageError`].
async fn recognize_page(
    engine: Arc<dyn OcrEngine>,
    page_num: usize,
    image: DynamicImage,
    timeout_secs: u64,
) -> PageText {
    let start = Instant::now();

    let work = async move {
        let binary = tokio::task::spawn_blocking(move || preprocess(&image))
            .await
            .map_err(|e| OcrError::RecognitionFailed(format!("preprocess task panicked: {e}")))?;
        engine.recognize(binary).await
    };

    // On timeout `work` is dropped, which cancels the engine call.
    let outcome = if timeout_secs == 0 {
        Some(work.await)
    } else {
        tokio::time::timeout(Duration::from_secs(timeout_secs), work)
            .await
            .ok()
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    let (text, error) = match outcome {
        Some(Ok(text)) => {
            debug!("Page {}: {} chars in {}ms", page_num, text.len(), duration_ms);
            (text, None)
        }
        Some(Err(e)) => {
            warn!("Page {}: recognition failed: {}", page_num, e);
            (
                String::new(),
                Some(PageError::RecognitionFailed {
                    page: page_num,
                    detail: e.to_string(),
                }),
            )
        }
        None => {
            warn!("Page {}: recognition timed out after {}s", page_num, timeout_secs);
            (
                String::new(),
                Some(PageError::Timeout {
                    page: page_num,
                    secs: timeout_secs,
                }),
            )
        }
    };

    PageText {
        page_num,
        text,
        duration_ms,
        error,
    }
}
