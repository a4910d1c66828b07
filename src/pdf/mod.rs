//! PDF page rasterization for thumbnails.
//!
//! - `PageRenderer` - the seam the thumbnail worker renders through
//! - `PdfiumRenderer` - pdfium-backed implementation
//! - `PdfiumLoader` - locating and binding the pdfium dynamic library
//!
//! Out-of-range pages fall back to the first page; the fallback is reported
//! in `RenderedPage` so the UI can show which page was actually used.

mod pdfium_loader;
mod renderer;

pub use pdfium_loader::PdfiumLoader;
pub use renderer::PdfiumRenderer;

use crate::error::{RenderError, RenderResult};
use crate::types::{PageIndex, ThumbnailSize};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Rasterizes one page of a PDF into a thumbnail-sized image.
///
/// Implementations must release the document before returning, on success
/// and on every error path.
pub trait PageRenderer: Send {
    fn render_page(
        &self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> RenderResult<RenderedPage>;
}

/// Output of a successful render
#[derive(Clone, Debug)]
pub struct RenderedPage {
    pub image: RgbaImage,
    pub page_used: PageIndex,
    pub page_count: u16,
    pub fell_back: bool,
}

/// Which page to rasterize for a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageResolution {
    pub page: PageIndex,
    pub fell_back: bool,
}

/// Clamp a requested page to the document: out of range means page 0.
pub fn resolve_page(requested: PageIndex, page_count: u16) -> RenderResult<PageResolution> {
    if page_count == 0 {
        return Err(RenderError::PageOutOfRange {
            requested,
            page_count,
        });
    }
    if requested.get() < page_count {
        Ok(PageResolution {
            page: requested,
            fell_back: false,
        })
    } else {
        Ok(PageResolution {
            page: PageIndex::FIRST,
            fell_back: true,
        })
    }
}

/// Shrink an image to fit the target box, keeping aspect ratio. Never enlarges.
pub fn fit_to_size(image: &DynamicImage, target: ThumbnailSize) -> RgbaImage {
    if image.width() <= target.width && image.height() <= target.height {
        return image.to_rgba8();
    }
    image
        .resize(target.width, target.height, FilterType::Lanczos3)
        .into_rgba8()
}
