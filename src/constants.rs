//! Application-wide constants.
//!
//! Centralizes cache layout names, thumbnail dimensions and render
//! parameters so the store, renderer and settings agree on them.

// ============================================================================
// Cache Layout
// ============================================================================

/// Cache directory used when settings don't name one (relative to the working directory)
pub const DEFAULT_CACHE_DIR: &str = "thumbnail_cache";

/// Extension of cached thumbnail images
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Extension of the sidecar linking a thumbnail back to its source file
pub const SIDECAR_EXTENSION: &str = "json";

/// Number of hex characters of the key digest kept in file names
pub const KEY_HASH_LEN: usize = 12;

/// Stem used when a source file name has no usable characters
pub const FALLBACK_STEM: &str = "document";

// ============================================================================
// Library
// ============================================================================

/// Extension (case-insensitive) of files picked up by a folder scan
pub const PDF_EXTENSION: &str = "pdf";

// ============================================================================
// Thumbnails
// ============================================================================

/// Default thumbnail width in pixels (grid cell layout)
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 100;

/// Default thumbnail height in pixels (grid cell layout)
pub const DEFAULT_THUMBNAIL_HEIGHT: u32 = 140;

/// Smallest accepted thumbnail dimension
pub const MIN_THUMBNAIL_DIM: u32 = 16;

/// Largest accepted thumbnail dimension
pub const MAX_THUMBNAIL_DIM: u32 = 1024;

/// Fill color of the placeholder shown for failed renders (light gray)
pub const PLACEHOLDER_RGB: [u8; 3] = [211, 211, 211];

// ============================================================================
// Rendering
// ============================================================================

/// Scale factor applied to the page before downsizing to the thumbnail
pub const RENDER_SCALE: f32 = 2.0;

/// Minimum accepted render scale
pub const MIN_RENDER_SCALE: f32 = 0.5;

/// Maximum accepted render scale
pub const MAX_RENDER_SCALE: f32 = 8.0;

// ============================================================================
// Settings
// ============================================================================

/// Directory under the platform config dir holding our settings
pub const SETTINGS_DIR_NAME: &str = "pdfshelf";

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default log filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "pdfshelf=info";
