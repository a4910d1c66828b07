//! pdfium-backed page renderer.

use super::{PageRenderer, PdfiumLoader, RenderedPage, fit_to_size, resolve_page};
use crate::error::{RenderError, RenderResult};
use crate::settings::Settings;
use crate::types::{PageIndex, ThumbnailSize};
use pdfium_render::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Renders thumbnails with a bound pdfium library.
///
/// Documents are opened per call and dropped before returning.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    render_scale: f32,
}

impl PdfiumRenderer {
    pub fn new(pdfium: Pdfium, render_scale: f32) -> Self {
        Self {
            pdfium,
            render_scale,
        }
    }

    /// Bind pdfium using the library path and render scale from settings
    pub fn from_settings(settings: &Settings) -> RenderResult<Self> {
        let pdfium = PdfiumLoader::load(settings.pdfium_library_path.as_deref())?;
        Ok(Self::new(pdfium, settings.render_scale))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_page(
        &self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> RenderResult<RenderedPage> {
        if !path.is_file() {
            return Err(RenderError::NotFound(path.to_path_buf()));
        }
        let start = Instant::now();

        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| map_pdfium_error(path, e))?;
        let pages = document.pages();
        let page_count = pages.len();
        let resolution = resolve_page(page, page_count)?;
        if resolution.fell_back {
            debug!(
                "{}: page {} out of range ({} pages), using page {}",
                path.display(),
                page,
                page_count,
                resolution.page
            );
        }

        let pdf_page = pages
            .get(resolution.page.get())
            .map_err(|e| map_pdfium_error(path, e))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(self.render_scale);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| map_pdfium_error(path, e))?;
        let image = fit_to_size(&bitmap.as_image(), target);

        debug!(
            "Rendered {} page {} in {:?}",
            path.display(),
            resolution.page,
            start.elapsed()
        );

        Ok(RenderedPage {
            image,
            page_used: resolution.page,
            page_count,
            fell_back: resolution.fell_back,
        })
    }
}

fn map_pdfium_error(path: &Path, err: PdfiumError) -> RenderError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            RenderError::Encrypted(path.to_path_buf())
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FileError) => {
            RenderError::Io(std::io::Error::other(format!(
                "pdfium could not read {}",
                path.display()
            )))
        }
        other => RenderError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{:?}", other),
        },
    }
}
