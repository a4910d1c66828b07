//! Error types for the thumbnail pipeline
//!
//! `RenderError` is what a `PageRenderer` reports. `CacheError` is the
//! taxonomy the cache manager and store speak; render failures convert into
//! it at the manager boundary. `LibraryError` covers folder scans.

use crate::types::PageIndex;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while rasterizing a PDF page
#[derive(Error, Debug)]
pub enum RenderError {
    /// Source PDF is missing or was moved
    #[error("PDF not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Document is password protected
    #[error("PDF is encrypted: {}", .0.display())]
    Encrypted(PathBuf),

    /// Document cannot be parsed or a page cannot be rasterized
    #[error("PDF is corrupt ({}): {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Document has no page that could stand in for the requested one
    #[error("page {requested} out of range (document has {page_count} pages)")]
    PageOutOfRange { requested: PageIndex, page_count: u16 },

    /// IO error while reading the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF library itself could not be loaded
    #[error("PDF library unavailable: {0}")]
    Binding(String),
}

/// Result type alias for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors surfaced by the cache store and cache manager
#[derive(Error, Debug)]
pub enum CacheError {
    /// Source PDF or cache record is missing
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Source PDF is password protected
    #[error("encrypted PDF: {}", .0.display())]
    Encrypted(PathBuf),

    /// Source PDF cannot be opened or decoded
    #[error("corrupt PDF: {0}")]
    Corrupt(String),

    /// Source PDF has no renderable page
    #[error("page {requested} out of range (document has {page_count} pages)")]
    PageOutOfRange { requested: PageIndex, page_count: u16 },

    /// Page number from the UI is not a valid page index
    #[error("invalid page number: {0}")]
    InvalidPage(i64),

    /// IO error reading or writing the cache directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cached image is unreadable
    #[error("cached thumbnail unreadable: {0}")]
    Decode(String),

    /// Thumbnail could not be encoded for storage
    #[error("thumbnail encoding failed: {0}")]
    Encode(String),

    /// Sidecar metadata could not be (de)serialized
    #[error("sidecar error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// The PDF library could not be loaded
    #[error("PDF library unavailable: {0}")]
    Binding(String),
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

impl From<RenderError> for CacheError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::NotFound(path) => CacheError::NotFound(path),
            RenderError::Encrypted(path) => CacheError::Encrypted(path),
            RenderError::Corrupt { path, reason } => {
                CacheError::Corrupt(format!("{}: {}", path.display(), reason))
            }
            RenderError::PageOutOfRange {
                requested,
                page_count,
            } => CacheError::PageOutOfRange {
                requested,
                page_count,
            },
            RenderError::Io(e) => CacheError::Io(e),
            RenderError::Binding(msg) => CacheError::Binding(msg),
        }
    }
}

/// Errors that can occur while scanning a folder
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Folder does not exist or is not a directory
    #[error("not a folder: {}", .0.display())]
    NotAFolder(PathBuf),

    /// Folder listing failed
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for library operations
pub type LibraryResult<T> = Result<T, LibraryError>;
