//! Configuration types for fiscal document extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. External collaborators (the pdfium
//! library used for rasterisation, the tesseract binary used for OCR) are
//! injected here as paths rather than looked up from hardcoded locations.

use crate::error::ExtractError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a single-document extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use fiscaldoc::{ClassifierProfile, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .dpi(200)
///     .concurrency(4)
///     .classifier(ClassifierProfile::Extended)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising pages for OCR. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 6000.
    ///
    /// An A4 page at 300 DPI is 2480 × 3508 px; the cap only bites on
    /// oversized pages.
    pub max_rendered_pixels: u32,

    /// Number of pages recognised at once. Default: available parallelism.
    pub concurrency: usize,

    /// Tesseract language codes. Default: `["por", "eng"]`.
    pub languages: Vec<String>,

    /// Tesseract executable. Default: `tesseract` (looked up on PATH).
    pub tesseract_path: PathBuf,

    /// pdfium shared library, or a directory containing it.
    /// If None, the system library is used.
    pub pdfium_library_path: Option<PathBuf>,

    /// Per-page recognition timeout in seconds. 0 disables it. Default: 120.
    pub page_timeout_secs: u64,

    /// Which rule table the classifier uses. Default: [`ClassifierProfile::Standard`].
    pub classifier: ClassifierProfile,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_path`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Optional OCR progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            concurrency: default_concurrency(),
            languages: vec!["por".to_string(), "eng".to_string()],
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_library_path: None,
            page_timeout_secs: 120,
            classifier: ClassifierProfile::default(),
            ocr_engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("languages", &self.languages)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("classifier", &self.classifier)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Tesseract `-l` argument, e.g. `por+eng`.
    pub fn language_arg(&self) -> String {
        self.languages.join("+")
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Replace the language list. Codes are tesseract's (`por`, `eng`, `spa`, …).
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn classifier(mut self, profile: ClassifierProfile) -> Self {
        self.config.classifier = profile;
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.languages.is_empty() || c.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig(
                "At least one non-empty OCR language is required".into(),
            ));
        }
        if c.tesseract_path.as_os_str().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Tesseract path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which document types the classifier recognises.
///
/// | Profile | Types (precedence order) |
/// |---------|--------------------------|
/// | Standard | NFS-e, NF-e, NFC-e, NF3-e, CT-e, Boleto, Fatura |
/// | Extended | DARF, FGTS, GPS, then the Standard list |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClassifierProfile {
    /// Invoices and fiscal notes. (default)
    #[default]
    Standard,
    /// Tax-payment guides ahead of invoices and fiscal notes.
    Extended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.languages, vec!["por", "eng"]);
        assert_eq!(c.language_arg(), "por+eng");
        assert_eq!(c.tesseract_path, PathBuf::from("tesseract"));
        assert!(c.pdfium_library_path.is_none());
        assert!(c.concurrency >= 1);
        assert_eq!(c.classifier, ClassifierProfile::Standard);
    }

    #[test]
    fn builder_clamps_values() {
        let c = ExtractionConfig::builder()
            .dpi(10)
            .concurrency(0)
            .max_rendered_pixels(1)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_rendered_pixels, 100);

        let c = ExtractionConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn builder_rejects_empty_languages() {
        let err = ExtractionConfig::builder()
            .languages(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));

        let err = ExtractionConfig::builder()
            .languages(["por", " "])
            .build()
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_tesseract_path() {
        let err = ExtractionConfig::builder()
            .tesseract_path("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Tesseract"));
    }

    #[test]
    fn builder_sets_collaborator_paths() {
        let c = ExtractionConfig::builder()
            .tesseract_path("/usr/local/bin/tesseract")
            .pdfium_library_path("/opt/pdfium/lib")
            .languages(["por"])
            .page_timeout_secs(0)
            .classifier(ClassifierProfile::Extended)
            .build()
            .unwrap();
        assert_eq!(c.tesseract_path, PathBuf::from("/usr/local/bin/tesseract"));
        assert_eq!(c.pdfium_library_path, Some(PathBuf::from("/opt/pdfium/lib")));
        assert_eq!(c.language_arg(), "por");
        assert_eq!(c.page_timeout_secs, 0);
        assert_eq!(c.classifier, ClassifierProfile::Extended);
    }

    #[test]
    fn debug_hides_trait_objects() {
        let dbg = format!("{:?}", ExtractionConfig::default());
        assert!(dbg.contains("ocr_engine: None"));
    }
}
