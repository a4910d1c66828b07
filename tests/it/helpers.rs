//! Test helpers and fixtures.
//!
//! This module provides:
//! - `FakeRenderer` - a `PageRenderer` over tiny text fixtures, no pdfium needed
//! - `GatedRenderer` - blocks each render until the test releases it
//! - `PanickingRenderer` - panics on files named `panic*.pdf`
//! - `TestFolderBuilder` - builder for a temp folder of fixture "PDFs"
//! - `Fixture` - the built folder plus a cache dir and render counter

use image::{Rgba, RgbaImage};
use pdfshelf::cache::CacheStore;
use pdfshelf::error::{RenderError, RenderResult};
use pdfshelf::library::Library;
use pdfshelf::manager::{CacheManager, ThumbnailEvent};
use pdfshelf::pdf::{PageRenderer, RenderedPage, resolve_page};
use pdfshelf::types::{PageIndex, ThumbnailSize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// First line of every well-formed fixture document
pub const FAKE_HEADER: &str = "%PDF-FAKE";

/// How long tests wait for the worker before giving up
pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Renderers
// ============================================================================

/// Renders fixture files of the form `%PDF-FAKE pages=N`.
///
/// Each page renders as a solid color derived from its index, so different
/// pages give different pixels. `%PDF-FAKE encrypted` reports encryption;
/// anything else is corrupt.
pub struct FakeRenderer {
    calls: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self { calls }
    }
}

impl PageRenderer for FakeRenderer {
    fn render_page(
        &self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> RenderResult<RenderedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let contents = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let body = contents
            .strip_prefix(FAKE_HEADER)
            .map(str::trim)
            .ok_or_else(|| RenderError::Corrupt {
                path: path.to_path_buf(),
                reason: "missing header".to_string(),
            })?;
        if body == "encrypted" {
            return Err(RenderError::Encrypted(path.to_path_buf()));
        }
        let page_count = body
            .strip_prefix("pages=")
            .and_then(|n| n.parse::<u16>().ok())
            .ok_or_else(|| RenderError::Corrupt {
                path: path.to_path_buf(),
                reason: "bad page count".to_string(),
            })?;

        let resolution = resolve_page(page, page_count)?;
        Ok(RenderedPage {
            image: RgbaImage::from_pixel(target.width, target.height, page_color(resolution.page)),
            page_used: resolution.page,
            page_count,
            fell_back: resolution.fell_back,
        })
    }
}

/// Color the fake renderer paints a page with
pub fn page_color(page: PageIndex) -> Rgba<u8> {
    Rgba([(u32::from(page.get()) * 40 % 256) as u8, 90, 200, 255])
}

/// Waits for one token on `gate` before each render.
pub struct GatedRenderer {
    inner: FakeRenderer,
    gate: Receiver<()>,
}

impl GatedRenderer {
    pub fn new(calls: Arc<AtomicUsize>, gate: Receiver<()>) -> Self {
        Self {
            inner: FakeRenderer::new(calls),
            gate,
        }
    }
}

impl PageRenderer for GatedRenderer {
    fn render_page(
        &self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> RenderResult<RenderedPage> {
        let _ = self.gate.recv();
        self.inner.render_page(path, page, target)
    }
}

/// `FakeRenderer` that panics on files whose name starts with `panic`.
pub struct PanickingRenderer {
    inner: FakeRenderer,
}

impl PanickingRenderer {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            inner: FakeRenderer::new(calls),
        }
    }
}

impl PageRenderer for PanickingRenderer {
    fn render_page(
        &self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> RenderResult<RenderedPage> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some_and(|n| n.starts_with("panic")) {
            panic!("renderer blew up on {}", path.display());
        }
        self.inner.render_page(path, page, target)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Builder for a temp folder of fixture documents.
///
/// # Example
/// ```ignore
/// let fixture = TestFolderBuilder::new()
///     .with_pdf("a.pdf", 3)
///     .with_corrupt("broken.pdf")
///     .build();
/// ```
#[derive(Default)]
pub struct TestFolderBuilder {
    files: Vec<(String, Vec<u8>)>,
}

impl TestFolderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A readable document with `pages` pages
    pub fn with_pdf(mut self, name: &str, pages: u16) -> Self {
        self.files
            .push((name.to_string(), format!("{} pages={}\n", FAKE_HEADER, pages).into_bytes()));
        self
    }

    pub fn with_corrupt(mut self, name: &str) -> Self {
        self.files
            .push((name.to_string(), b"\x00\x01 definitely not a pdf".to_vec()));
        self
    }

    pub fn with_encrypted(mut self, name: &str) -> Self {
        self.files
            .push((name.to_string(), format!("{} encrypted\n", FAKE_HEADER).into_bytes()));
        self
    }

    /// Arbitrary file (e.g. non-PDF noise in the folder)
    pub fn with_file(mut self, name: &str, contents: &str) -> Self {
        self.files.push((name.to_string(), contents.as_bytes().to_vec()));
        self
    }

    pub fn build(self) -> Fixture {
        let docs = tempfile::tempdir().unwrap();
        for (name, contents) in self.files {
            fs::write(docs.path().join(name), contents).unwrap();
        }
        Fixture {
            docs,
            cache: tempfile::tempdir().unwrap(),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// A fixture folder, a cache directory and a shared render counter.
pub struct Fixture {
    pub docs: TempDir,
    pub cache: TempDir,
    pub renders: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn doc(&self, name: &str) -> PathBuf {
        self.docs.path().join(name)
    }

    pub fn store(&self) -> Arc<CacheStore> {
        Arc::new(CacheStore::open(self.cache.path()).unwrap())
    }

    /// Manager over this fixture's cache using a `FakeRenderer`
    pub fn manager(&self) -> CacheManager {
        self.manager_with(Box::new(FakeRenderer::new(Arc::clone(&self.renders))))
    }

    pub fn manager_with(&self, renderer: Box<dyn PageRenderer>) -> CacheManager {
        CacheManager::new(self.store(), renderer, ThumbnailSize::default()).unwrap()
    }

    pub fn library(&self) -> Library {
        Library::scan(self.docs.path()).unwrap()
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Polling
// ============================================================================

/// Drain results until the manager has nothing outstanding
pub fn pump(manager: &mut CacheManager, library: &mut Library) -> Vec<ThumbnailEvent> {
    let events = manager.wait_for_completions(library, WAIT);
    assert!(!manager.is_busy(), "manager still busy after {:?}", WAIT);
    events
}

/// Poll `condition` until it holds or the timeout passes
pub fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Pages of every `Ready` event, in delivery order
pub fn ready_pages(events: &[ThumbnailEvent], path: &Path) -> Vec<PageIndex> {
    events
        .iter()
        .filter_map(|e| match e {
            ThumbnailEvent::Ready { path: p, page, .. } if p == path => Some(*page),
            _ => None,
        })
        .collect()
}
