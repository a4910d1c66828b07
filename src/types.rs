//! Core value types shared by the store, renderer and manager.

use crate::constants::{DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH, PLACEHOLDER_RGB};
use crate::error::CacheError;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Page Index
// ============================================================================

/// Zero-based page number within a PDF.
///
/// Stored as `u16` to match pdfium's page index type. UI input (spin boxes,
/// text fields) goes through `TryFrom<i64>`, which rejects negative and
/// oversized values before anything is rendered.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PageIndex(u16);

impl PageIndex {
    /// The first page of a document
    pub const FIRST: PageIndex = PageIndex(0);

    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<u16> for PageIndex {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl TryFrom<i64> for PageIndex {
    type Error = CacheError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| CacheError::InvalidPage(value))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Thumbnail Size
// ============================================================================

/// Bounding box a thumbnail must fit into, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether an image of the given dimensions is a usable thumbnail for this box
    #[inline]
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width > 0 && height > 0 && width <= self.width && height <= self.height
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_WIDTH, DEFAULT_THUMBNAIL_HEIGHT)
    }
}

// ============================================================================
// Thumbnail
// ============================================================================

/// Where a delivered thumbnail came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbnailSource {
    /// Freshly rasterized by the worker
    Rendered,
    /// Read back from the cache directory
    Cache,
    /// Stand-in for a failed render
    Placeholder,
}

/// A decoded thumbnail ready for display.
#[derive(Clone, Debug)]
pub struct Thumbnail {
    pub image: RgbaImage,
    /// Page the caller asked for
    pub requested_page: PageIndex,
    /// Page that was actually rasterized (differs after an out-of-range fallback)
    pub page_used: PageIndex,
    pub source: ThumbnailSource,
}

impl Thumbnail {
    /// Light gray box of the target size, shown when a file can't be rendered
    pub fn placeholder(size: ThumbnailSize, page: PageIndex) -> Self {
        let [r, g, b] = PLACEHOLDER_RGB;
        Self {
            image: RgbaImage::from_pixel(size.width, size.height, Rgba([r, g, b, 255])),
            requested_page: page,
            page_used: page,
            source: ThumbnailSource::Placeholder,
        }
    }

    /// True when the rendered page differs from the requested one
    pub fn fell_back(&self) -> bool {
        self.requested_page != self.page_used
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ThumbnailSource::Placeholder
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
