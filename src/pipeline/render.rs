//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Only reached when the text layer is empty. The pdfium library is bound per
//! call from [`ExtractionConfig::pdfium_library_path`] (a file, or a directory
//! holding the platform library) or, if unset, from the system library path.
//!
//! The `pdfium-render` crate wraps a C++ library that keeps thread-local
//! state, so [`render_pages`] runs the work inside
//! `tokio::task::spawn_blocking`.

use crate::config::ExtractionConfig;
use crate::error::RenderError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasteriser for PDF pages.
pub trait PageRenderer: Send + Sync {
    /// Render every page at `dpi`, in page order.
    fn render(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, RenderError>;
}

/// The default renderer, backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
    max_pixels: u32,
}

impl PdfiumRenderer {
    pub fn new(library_path: Option<PathBuf>, max_pixels: u32) -> Self {
        Self {
            library_path,
            max_pixels,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.pdfium_library_path.clone(), config.max_rendered_pixels)
    }

    fn bind(&self) -> Result<Pdfium, RenderError> {
        let bindings = match &self.library_path {
            Some(path) if path.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| RenderError::RendererUnavailable {
            path: self.library_path.clone(),
            detail: format!("{:?}", e),
        })?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, pdf_path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, RenderError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| RenderError::LoadFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("Rendering {} pages at {} DPI", total_pages, dpi);

        // PDF user space is 72 units per inch.
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| RenderError::PageFailed {
                        page: idx + 1,
                        detail: format!("{:?}", e),
                    })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Render every page of `pdf_path` off the async executor.
pub async fn render_pages(
    renderer: std::sync::Arc<dyn PageRenderer>,
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<DynamicImage>, RenderError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || renderer.render(&path, dpi))
        .await
        .map_err(|e| RenderError::Task(format!("Render task panicked: {}", e)))?
}
