//! Flat-directory thumbnail store.
//!
//! Each record is `<key>.png` plus a `<key>.json` sidecar. Both files are
//! written to a temp file in the same directory and renamed into place, the
//! sidecar first, so a record whose image exists was written completely.

use super::key::CacheKey;
use crate::constants::{SIDECAR_EXTENSION, THUMBNAIL_EXTENSION};
use crate::error::{CacheError, CacheResult};
use crate::types::PageIndex;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Sidecar metadata linking a cached thumbnail to its source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub original_filename: String,
    pub source_path: PathBuf,
    pub requested_page: PageIndex,
    pub page_used: PageIndex,
    pub page_count: u16,
    pub width: u32,
    pub height: u32,
    /// Seconds since the Unix epoch
    pub created_at: u64,
}

impl RecordMeta {
    pub fn new(
        source: &Path,
        requested_page: PageIndex,
        page_used: PageIndex,
        page_count: u16,
        image: &RgbaImage,
    ) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            original_filename: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source_path: source.to_path_buf(),
            requested_page,
            page_used,
            page_count,
            width: image.width(),
            height: image.height(),
            created_at,
        }
    }
}

/// A record read back from disk
#[derive(Clone, Debug)]
pub struct CachedThumbnail {
    pub image: RgbaImage,
    /// Missing when the sidecar was deleted or is unreadable
    pub meta: Option<RecordMeta>,
}

/// Thumbnail store rooted at a single cache directory.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) the cache directory.
    ///
    /// Failure here means the cache is unusable for the whole session.
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(CacheError::NotFound(dir));
        }
        info!("Thumbnail cache at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.image_file_name())
    }

    pub fn sidecar_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.sidecar_file_name())
    }

    pub fn has(&self, key: &CacheKey) -> bool {
        self.image_path(key).is_file()
    }

    /// Read and decode a record
    pub fn read(&self, key: &CacheKey) -> CacheResult<CachedThumbnail> {
        let path = self.image_path(key);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::NotFound(path.clone())
            } else {
                CacheError::Io(e)
            }
        })?;

        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .map_err(|e| CacheError::Decode(format!("{}: {}", path.display(), e)))?
            .into_rgba8();

        let meta = match self.read_meta(key) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!("No usable sidecar for {}: {}", key, e);
                None
            }
        };

        Ok(CachedThumbnail { image, meta })
    }

    pub fn read_meta(&self, key: &CacheKey) -> CacheResult<RecordMeta> {
        let bytes = fs::read(self.sidecar_path(key))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write a record, replacing any existing one for the key
    pub fn write(&self, key: &CacheKey, image: &RgbaImage, meta: &RecordMeta) -> CacheResult<()> {
        let start = Instant::now();

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| CacheError::Encode(e.to_string()))?;
        let sidecar = serde_json::to_vec_pretty(meta)?;

        self.persist(&self.sidecar_path(key), &sidecar)?;
        self.persist(&self.image_path(key), png.get_ref())?;

        debug!(
            "Cached {} ({}x{}, {} bytes) in {:?}",
            key,
            image.width(),
            image.height(),
            png.get_ref().len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Temp file in the cache dir, then rename over the target.
    /// The temp file is removed on drop if anything fails.
    fn persist(&self, target: &Path, bytes: &[u8]) -> CacheResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(target).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    /// Remove one record. Returns whether an image was present.
    pub fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        let existed = remove_if_present(&self.image_path(key))?;
        remove_if_present(&self.sidecar_path(key))?;
        Ok(existed)
    }

    /// Delete every record (and any leftover temp files), keeping the directory.
    /// Returns the number of thumbnails removed.
    pub fn clear(&self) -> CacheResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let ext = path.extension().and_then(|e| e.to_str());
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(".tmp"));
            if ext == Some(THUMBNAIL_EXTENSION) {
                fs::remove_file(&path)?;
                removed += 1;
            } else if ext == Some(SIDECAR_EXTENSION) || is_temp {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Could not remove {}: {}", path.display(), e);
                }
            }
        }
        info!("Cleared {} cached thumbnails", removed);
        Ok(removed)
    }

    /// Keys of every record currently on disk
    pub fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(key) = entry.file_name().to_str().and_then(CacheKey::from_file_name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Number of records on disk; 0 (with a warning) if the directory can't be listed
    pub fn len(&self) -> usize {
        match self.keys() {
            Ok(keys) => keys.len(),
            Err(e) => {
                warn!("Could not list cache {}: {}", self.dir.display(), e);
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_if_present(path: &Path) -> CacheResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
