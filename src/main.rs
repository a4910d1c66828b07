//! Headless launcher: warm the thumbnail cache for a folder.
//!
//! `pdfshelf [FOLDER]` loads settings, opens the cache, binds pdfium and
//! renders every missing thumbnail in FOLDER. Without a folder it only
//! checks that the cache and pdfium are usable.

use anyhow::{Context, Result};
use pdfshelf::cache::CacheStore;
use pdfshelf::library::ThumbnailStatus;
use pdfshelf::pdf::PdfiumRenderer;
use pdfshelf::settings::Settings;
use pdfshelf::{CacheManager, ThumbnailEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound on a single wait for worker results
const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    pdfshelf::logging::init();

    let settings = Settings::load();
    let store = CacheStore::open(&settings.cache_dir).with_context(|| {
        format!(
            "thumbnail cache directory {} is not usable",
            settings.cache_dir.display()
        )
    })?;
    let renderer =
        PdfiumRenderer::from_settings(&settings).context("failed to load the pdfium library")?;
    let mut manager = CacheManager::new(
        Arc::new(store),
        Box::new(renderer),
        settings.thumbnail_size(),
    )
    .context("failed to start the thumbnail worker")?;

    let Some(folder) = std::env::args_os().nth(1).map(PathBuf::from) else {
        info!(
            "Ready; {} thumbnails cached in {}",
            manager.store().len(),
            manager.store().dir().display()
        );
        return Ok(());
    };

    let start = Instant::now();
    let mut library = manager
        .open_library(&folder)
        .with_context(|| format!("cannot open {}", folder.display()))?;
    info!("{} PDFs in {}", library.len(), library.folder().display());

    loop {
        for event in manager.wait_for_completions(&mut library, POLL_INTERVAL) {
            match event {
                ThumbnailEvent::Ready {
                    path, thumbnail, ..
                } if thumbnail.fell_back() => info!(
                    "{}: page {} missing, used page {}",
                    path.display(),
                    thumbnail.requested_page,
                    thumbnail.page_used
                ),
                ThumbnailEvent::Failed { path, reason, .. } => {
                    warn!("{}: {}", path.display(), reason)
                }
                _ => {}
            }
        }
        if !manager.is_busy() {
            break;
        }
        info!("{}% done", manager.progress().percent());
    }

    let cached = library.count_with(|s| *s == ThumbnailStatus::Cached);
    let failed = library.count_with(|s| matches!(s, ThumbnailStatus::Failed { .. }));
    info!(
        "{} cached, {} failed in {:?}",
        cached,
        failed,
        start.elapsed()
    );
    Ok(())
}
