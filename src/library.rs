//! In-memory model of the PDF folder being browsed.
//!
//! Owned by the UI layer. The cache manager updates page selections and
//! thumbnail status through `&mut Library` handed to it per call.

use crate::constants::PDF_EXTENSION;
use crate::error::{LibraryError, LibraryResult};
use crate::types::PageIndex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Thumbnail state of a library entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ThumbnailStatus {
    /// Not rendered yet (or render pending)
    #[default]
    Uncached,
    /// Current thumbnail is available
    Cached,
    /// Page selection changed or cache cleared; regeneration pending
    Stale,
    /// Last render failed
    Failed { reason: String },
}

/// A PDF file in the open folder.
#[derive(Clone, Debug, PartialEq)]
pub struct LibraryEntry {
    /// Absolute path to the PDF
    pub path: PathBuf,
    /// File name shown under the thumbnail
    pub name: String,
    /// Page chosen to represent this file
    pub page: PageIndex,
    pub status: ThumbnailStatus,
    /// Page actually rendered for the current thumbnail (after any fallback)
    pub page_used: Option<PageIndex>,
}

impl LibraryEntry {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            page: PageIndex::FIRST,
            status: ThumbnailStatus::Uncached,
            page_used: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ThumbnailStatus::Failed { .. })
    }
}

/// PDFs found directly inside one folder, sorted by file name.
#[derive(Clone, Debug)]
pub struct Library {
    folder: PathBuf,
    entries: Vec<LibraryEntry>,
}

impl Library {
    /// List the PDFs in `folder` (non-recursive)
    pub fn scan(folder: impl AsRef<Path>) -> LibraryResult<Self> {
        let folder = std::path::absolute(folder.as_ref()).map_err(|source| LibraryError::Io {
            path: folder.as_ref().to_path_buf(),
            source,
        })?;
        let entries = scan_folder(&folder)?
            .into_iter()
            .map(LibraryEntry::new)
            .collect::<Vec<_>>();
        debug!("Found {} PDFs in {}", entries.len(), folder.display());
        Ok(Self { folder, entries })
    }

    /// Re-list the folder, keeping page selections of files that still exist.
    ///
    /// Statuses reset to `Uncached`; the caller reloads thumbnails afterwards.
    pub fn rescan(&mut self) -> LibraryResult<()> {
        let mut pages: HashMap<PathBuf, PageIndex> = self
            .entries
            .drain(..)
            .map(|e| (e.path, e.page))
            .collect();
        self.entries = scan_folder(&self.folder)?
            .into_iter()
            .map(|path| {
                let page = pages.remove(&path).unwrap_or_default();
                LibraryEntry {
                    page,
                    ..LibraryEntry::new(path)
                }
            })
            .collect();
        Ok(())
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut LibraryEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, path: &Path) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn entry_mut(&mut self, path: &Path) -> Option<&mut LibraryEntry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }

    /// Drop an entry (e.g. after the file was deleted)
    pub fn remove(&mut self, path: &Path) -> Option<LibraryEntry> {
        let index = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(index))
    }

    /// Entries whose file name contains `query`, ignoring case. Empty query matches all.
    pub fn filter(&self, query: &str) -> Vec<&LibraryEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|e| query.is_empty() || e.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Mark every entry stale (after the cache was cleared)
    pub fn mark_all_stale(&mut self) {
        for entry in &mut self.entries {
            entry.status = ThumbnailStatus::Stale;
            entry.page_used = None;
        }
    }

    pub fn count_with(&self, pred: impl Fn(&ThumbnailStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// True for regular files with a `.pdf` extension in any case
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(PDF_EXTENSION))
        && path.is_file()
}

fn scan_folder(folder: &Path) -> LibraryResult<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(LibraryError::NotAFolder(folder.to_path_buf()));
    }
    let io_err = |source| LibraryError::Io {
        path: folder.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(folder).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if is_pdf(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
