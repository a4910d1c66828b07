//! pdfshelf - browse folders of PDFs as a grid of page thumbnails.
//!
//! The crate is the thumbnail core behind the grid:
//!
//! - `library` - the scanned folder and each file's chosen page
//! - `cache` - hash-keyed thumbnail records on disk
//! - `pdf` - page rasterization through pdfium
//! - `worker` - the single background render thread
//! - `manager` - lookups, page selection and result delivery for the UI
//!
//! A front end owns a `Library`, calls `CacheManager::get_thumbnail` or
//! `load_library` to populate the grid, and drains
//! `CacheManager::process_completions` on every event-loop tick.

pub mod cache;
pub mod constants;
pub mod error;
pub mod library;
pub mod logging;
pub mod manager;
pub mod pdf;
pub mod settings;
pub mod types;
pub mod worker;

pub use error::{CacheError, CacheResult, LibraryError, RenderError, RenderResult};
pub use manager::{CacheManager, ThumbnailEvent, ThumbnailLookup};
