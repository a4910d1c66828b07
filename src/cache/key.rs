//! Cache key derivation.

use crate::constants::{FALLBACK_STEM, KEY_HASH_LEN, SIDECAR_EXTENSION, THUMBNAIL_EXTENSION};
use crate::error::{CacheError, CacheResult};
use crate::types::PageIndex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of a cache record, e.g. `annual_report_3f2a9c01b7de_p0`.
///
/// The readable prefix is the sanitized file stem, followed by a digest of
/// the absolute path, modification time and page, then the page number.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a file as it currently exists on disk.
    pub fn for_file(path: &Path, page: PageIndex) -> CacheResult<Self> {
        let absolute = std::path::absolute(path)?;
        let metadata = std::fs::metadata(&absolute).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::NotFound(absolute.clone())
            } else {
                CacheError::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(CacheError::NotFound(absolute));
        }
        Ok(Self::derive(&absolute, metadata.modified()?, page))
    }

    /// Key from already-known file identity.
    pub fn derive(path: &Path, modified: SystemTime, page: PageIndex) -> Self {
        let mtime = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(mtime.to_le_bytes());
        hasher.update(b"\0");
        hasher.update(page.get().to_le_bytes());
        let digest = hasher.finalize();

        let hash: String = digest
            .iter()
            .take(KEY_HASH_LEN / 2)
            .map(|b| format!("{:02x}", b))
            .collect();

        Self(format!("{}_{}_p{}", sanitize_stem(path), hash, page))
    }

    /// Recover a key from a cached image's file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{}", THUMBNAIL_EXTENSION))?;
        let mut parts = stem.rsplitn(3, '_');
        let page = parts.next()?;
        let hash = parts.next()?;
        let prefix = parts.next()?;
        let valid = page.strip_prefix('p').is_some_and(|p| p.parse::<u16>().is_ok())
            && hash.len() == KEY_HASH_LEN
            && !prefix.is_empty();
        valid.then(|| Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sanitized source file stem embedded in the key
    pub fn stem_hint(&self) -> &str {
        self.0.rsplitn(3, '_').nth(2).unwrap_or(&self.0)
    }

    pub fn image_file_name(&self) -> String {
        format!("{}.{}", self.0, THUMBNAIL_EXTENSION)
    }

    pub fn sidecar_file_name(&self) -> String {
        format!("{}.{}", self.0, SIDECAR_EXTENSION)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File stem reduced to characters safe in any file system
fn sanitize_stem(path: &Path) -> String {
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}
