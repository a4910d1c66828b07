//! Persistent application settings.
//!
//! Stored as JSON at `<config dir>/pdfshelf/settings.json`. Missing or
//! malformed files fall back to defaults so startup never fails on them.

use crate::constants::{
    DEFAULT_CACHE_DIR, DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH, MAX_RENDER_SCALE,
    MAX_THUMBNAIL_DIM, MIN_RENDER_SCALE, MIN_THUMBNAIL_DIM, RENDER_SCALE, SETTINGS_DIR_NAME,
    SETTINGS_FILE_NAME,
};
use crate::types::ThumbnailSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding cached thumbnails
    pub cache_dir: PathBuf,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Page scale factor used before downsizing to the thumbnail
    pub render_scale: f32,
    /// Explicit pdfium library (file or directory); searched for when unset
    pub pdfium_library_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            thumbnail_height: DEFAULT_THUMBNAIL_HEIGHT,
            render_scale: RENDER_SCALE,
            pdfium_library_path: None,
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match default_settings_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings.validated())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Clamp numeric fields into their supported ranges
    pub fn validated(mut self) -> Self {
        self.thumbnail_width = self
            .thumbnail_width
            .clamp(MIN_THUMBNAIL_DIM, MAX_THUMBNAIL_DIM);
        self.thumbnail_height = self
            .thumbnail_height
            .clamp(MIN_THUMBNAIL_DIM, MAX_THUMBNAIL_DIM);
        self.render_scale = if self.render_scale.is_finite() {
            self.render_scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE)
        } else {
            RENDER_SCALE
        };
        self
    }

    pub fn thumbnail_size(&self) -> ThumbnailSize {
        ThumbnailSize::new(self.thumbnail_width, self.thumbnail_height)
    }
}

/// `<config dir>/pdfshelf/settings.json`, if the platform has a config dir
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
}
