//! Cache manager: the single entry point the UI uses for thumbnails.
//!
//! `get_thumbnail` answers synchronously from memory or the cache directory,
//! otherwise it queues a render on the worker and answers `Pending`.
//! `apply_page` / `apply_page_all` change page selections and force
//! regeneration. Completed work reaches the UI as `ThumbnailEvent`s returned
//! by `process_completions`, which the UI calls on each event-loop tick.
//!
//! ## Error Handling
//!
//! Per-file failures (missing, encrypted or corrupt PDFs, cache IO) never
//! escape as errors from the worker. They become a `Failed` entry status and
//! a `ThumbnailEvent::Failed` carrying a placeholder image. Batches keep
//! going past failures and report them together when the last file is done.

use crate::cache::{CacheKey, CacheStore};
use crate::error::{CacheError, CacheResult, LibraryResult};
use crate::library::{Library, ThumbnailStatus};
use crate::pdf::PageRenderer;
use crate::types::{PageIndex, Thumbnail, ThumbnailSize, ThumbnailSource};
use crate::worker::{Job, RenderRequest, RequestId, ThumbnailWorker, WorkerOutput};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Answer to a thumbnail lookup
#[derive(Clone, Debug)]
pub enum ThumbnailLookup {
    Ready(Arc<Thumbnail>),
    /// Render queued; a `ThumbnailEvent` follows
    Pending,
}

impl ThumbnailLookup {
    pub fn is_pending(&self) -> bool {
        matches!(self, ThumbnailLookup::Pending)
    }

    pub fn ready(self) -> Option<Arc<Thumbnail>> {
        match self {
            ThumbnailLookup::Ready(thumb) => Some(thumb),
            ThumbnailLookup::Pending => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u64);

/// One file that failed within a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of an `apply_page_all` run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchReport {
    pub id: BatchId,
    pub page: PageIndex,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}

/// Notification for the UI thread
#[derive(Clone, Debug)]
pub enum ThumbnailEvent {
    Ready {
        path: PathBuf,
        page: PageIndex,
        thumbnail: Arc<Thumbnail>,
    },
    Failed {
        path: PathBuf,
        page: PageIndex,
        reason: String,
        placeholder: Arc<Thumbnail>,
    },
    BatchFinished(BatchReport),
    CacheCleared {
        removed: usize,
    },
    /// Clearing the cache failed; records may be partially removed
    ClearFailed {
        reason: String,
    },
}

/// Completed vs queued renders since the queue was last empty
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }

    /// 0-100, and 100 when nothing is queued
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

/// Requests of a batch still outstanding plus what has come back
struct BatchState {
    page: PageIndex,
    outstanding: usize,
    succeeded: usize,
    failures: Vec<BatchFailure>,
}

impl BatchState {
    fn into_report(self, id: BatchId) -> BatchReport {
        BatchReport {
            id,
            page: self.page,
            succeeded: self.succeeded,
            failures: self.failures,
        }
    }
}

pub struct CacheManager {
    store: Arc<CacheStore>,
    worker: ThumbnailWorker,
    /// Size used for renders the manager starts on its own (apply/load)
    target: ThumbnailSize,
    /// Thumbnails delivered for the open library
    memo: HashMap<CacheKey, Arc<Thumbnail>>,
    /// Latest request per key still on the worker
    in_flight: HashMap<CacheKey, RequestId>,
    /// Bumped on each `apply_page` for a file; older results don't update the entry
    generations: HashMap<PathBuf, u64>,
    request_batches: HashMap<RequestId, BatchId>,
    batches: HashMap<BatchId, BatchState>,
    pending_clears: usize,
    events: VecDeque<ThumbnailEvent>,
    progress: Progress,
    next_request: u64,
    next_batch: u64,
}

impl CacheManager {
    /// Start the worker thread over `store` with the given renderer
    pub fn new(
        store: Arc<CacheStore>,
        renderer: Box<dyn PageRenderer>,
        target: ThumbnailSize,
    ) -> CacheResult<Self> {
        let worker = ThumbnailWorker::spawn(Arc::clone(&store), renderer)?;
        Ok(Self {
            store,
            worker,
            target,
            memo: HashMap::new(),
            in_flight: HashMap::new(),
            generations: HashMap::new(),
            request_batches: HashMap::new(),
            batches: HashMap::new(),
            pending_clears: 0,
            events: VecDeque::new(),
            progress: Progress::default(),
            next_request: 0,
            next_batch: 0,
        })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn target(&self) -> ThumbnailSize {
        self.target
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Thumbnails currently held in memory
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    /// Work outstanding on the worker that this library still cares about
    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty() || !self.batches.is_empty() || self.pending_clears > 0
    }

    /// Whether the worker has nothing queued or running (including cancelled work)
    pub fn worker_idle(&self) -> bool {
        self.worker.is_idle()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Thumbnail for `(path, page)` if available now, else queue a render.
    pub fn get_thumbnail(
        &mut self,
        path: &Path,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> CacheResult<ThumbnailLookup> {
        let key = CacheKey::for_file(path, page)?;

        if let Some(thumb) = self.memo.get(&key) {
            if target.fits(thumb.image.width(), thumb.image.height()) {
                return Ok(ThumbnailLookup::Ready(Arc::clone(thumb)));
            }
        }

        if self.in_flight.contains_key(&key) {
            return Ok(ThumbnailLookup::Pending);
        }

        if let Some(thumb) = self.read_valid(&key, page, target) {
            let thumb = Arc::new(thumb);
            self.memo.insert(key, Arc::clone(&thumb));
            return Ok(ThumbnailLookup::Ready(thumb));
        }

        let generation = self.generation(path);
        self.enqueue(path, key, page, target, generation, None);
        Ok(ThumbnailLookup::Pending)
    }

    /// Cached record if present, decodable and sized for `target`
    fn read_valid(
        &self,
        key: &CacheKey,
        page: PageIndex,
        target: ThumbnailSize,
    ) -> Option<Thumbnail> {
        if !self.store.has(key) {
            return None;
        }
        match self.store.read(key) {
            Ok(cached) if target.fits(cached.image.width(), cached.image.height()) => {
                let page_used = cached.meta.map(|m| m.page_used).unwrap_or(page);
                Some(Thumbnail {
                    image: cached.image,
                    requested_page: page,
                    page_used,
                    source: ThumbnailSource::Cache,
                })
            }
            Ok(cached) => {
                debug!(
                    "Cached {} is {}x{}, wanted within {}x{}; regenerating",
                    key,
                    cached.image.width(),
                    cached.image.height(),
                    target.width,
                    target.height
                );
                None
            }
            Err(e) => {
                warn!("Discarding unreadable cache record {}: {}", key, e);
                None
            }
        }
    }

    /// Resolve every entry's thumbnail: cache hits update the entry now,
    /// misses are queued.
    pub fn load_library(&mut self, library: &mut Library) {
        let target = self.target;
        for entry in library.entries_mut() {
            match self.get_thumbnail(&entry.path, entry.page, target) {
                Ok(ThumbnailLookup::Ready(thumbnail)) => {
                    entry.status = ThumbnailStatus::Cached;
                    entry.page_used = Some(thumbnail.page_used);
                    self.events.push_back(ThumbnailEvent::Ready {
                        path: entry.path.clone(),
                        page: entry.page,
                        thumbnail,
                    });
                }
                Ok(ThumbnailLookup::Pending) => {}
                Err(e) => {
                    entry.status = ThumbnailStatus::Failed {
                        reason: e.to_string(),
                    };
                    let event = self.failed_event(&entry.path, entry.page, e.to_string());
                    self.events.push_back(event);
                }
            }
        }
    }

    // ========================================================================
    // Page selection
    // ========================================================================

    /// Select `page` for one file and force its thumbnail to be regenerated.
    pub fn apply_page(
        &mut self,
        library: &mut Library,
        path: &Path,
        page: PageIndex,
    ) -> CacheResult<RequestId> {
        let target = self.target;
        let entry = library
            .entry_mut(path)
            .ok_or_else(|| CacheError::NotFound(path.to_path_buf()))?;
        entry.page = page;
        entry.status = ThumbnailStatus::Stale;
        entry.page_used = None;

        let key = match CacheKey::for_file(path, page) {
            Ok(key) => key,
            Err(e) => {
                entry.status = ThumbnailStatus::Failed {
                    reason: e.to_string(),
                };
                return Err(e);
            }
        };
        self.memo.remove(&key);
        let generation = self.bump_generation(path);
        Ok(self.enqueue(path, key, page, target, generation, None))
    }

    /// Select `page` for every file in the library and regenerate all thumbnails.
    ///
    /// Each file is attempted on its own; a `BatchFinished` event reports the
    /// outcome once every file is done.
    pub fn apply_page_all(&mut self, library: &mut Library, page: PageIndex) -> BatchId {
        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        let target = self.target;

        let mut state = BatchState {
            page,
            outstanding: 0,
            succeeded: 0,
            failures: Vec::new(),
        };

        let mut queue = Vec::new();
        for entry in library.entries_mut() {
            entry.page = page;
            entry.status = ThumbnailStatus::Stale;
            entry.page_used = None;

            match CacheKey::for_file(&entry.path, page) {
                Ok(key) => queue.push((entry.path.clone(), key)),
                Err(e) => {
                    entry.status = ThumbnailStatus::Failed {
                        reason: e.to_string(),
                    };
                    state.failures.push(BatchFailure {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Applying page {} to {} files ({} queued)",
            page,
            library.len(),
            queue.len()
        );

        if queue.is_empty() {
            self.events
                .push_back(ThumbnailEvent::BatchFinished(state.into_report(id)));
            return id;
        }

        // Registered before submitting so a refused submit still counts toward the batch
        state.outstanding = queue.len();
        self.batches.insert(id, state);
        for (path, key) in queue {
            self.memo.remove(&key);
            let generation = self.bump_generation(&path);
            self.enqueue(&path, key, page, target, generation, Some(id));
        }
        id
    }

    // ========================================================================
    // Library lifecycle
    // ========================================================================

    /// Scan `folder` and start loading its thumbnails, abandoning the current library.
    pub fn open_library(&mut self, folder: impl AsRef<Path>) -> LibraryResult<Library> {
        self.close_library();
        let mut library = Library::scan(folder)?;
        self.load_library(&mut library);
        Ok(library)
    }

    /// Abandon outstanding work; results still in flight are dropped on arrival.
    pub fn close_library(&mut self) {
        let epoch = self.worker.cancel_pending();
        let dropped = self.in_flight.len();
        self.in_flight.clear();
        self.request_batches.clear();
        self.batches.clear();
        self.generations.clear();
        self.memo.clear();
        self.events.clear();
        self.progress = Progress::default();
        if dropped > 0 {
            debug!("Cancelled {} pending thumbnails (epoch {})", dropped, epoch);
        }
    }

    /// Delete every cached thumbnail. Runs on the worker after queued renders.
    pub fn clear_cache(&mut self) {
        self.memo.clear();
        if self.worker.submit(Job::Clear {
            epoch: self.worker.epoch(),
        }) {
            self.pending_clears += 1;
        }
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Apply worker results to `library` and return every event since the last call.
    pub fn process_completions(&mut self, library: &mut Library) -> Vec<ThumbnailEvent> {
        for output in self.worker.drain() {
            match output {
                WorkerOutput::Rendered { request, result } => {
                    self.complete_render(library, request, result)
                }
                WorkerOutput::Cleared { epoch, result } => {
                    self.pending_clears = self.pending_clears.saturating_sub(1);
                    // Renders queued ahead of the clear may have memoized images since
                    self.memo.clear();
                    let event = match result {
                        Ok(removed) => {
                            if epoch == self.worker.epoch() {
                                library.mark_all_stale();
                            }
                            ThumbnailEvent::CacheCleared { removed }
                        }
                        Err(e) => ThumbnailEvent::ClearFailed {
                            reason: e.to_string(),
                        },
                    };
                    self.events.push_back(event);
                }
            }
        }
        self.events.drain(..).collect()
    }

    /// `process_completions`, blocking up to `timeout` until the manager is idle.
    ///
    /// For headless runs and tests; a UI must not block its event loop on this.
    pub fn wait_for_completions(
        &mut self,
        library: &mut Library,
        timeout: Duration,
    ) -> Vec<ThumbnailEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.process_completions(library);
        while self.is_busy() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.worker.wait_for_output(deadline - now);
            events.extend(self.process_completions(library));
        }
        events
    }

    fn complete_render(
        &mut self,
        library: &mut Library,
        request: RenderRequest,
        result: CacheResult<Thumbnail>,
    ) {
        if request.epoch != self.worker.epoch() {
            debug!("Dropping stale result for {}", request.path.display());
            return;
        }
        if self.in_flight.get(&request.key) == Some(&request.id) {
            self.in_flight.remove(&request.key);
        }
        self.progress.completed += 1;

        let current = self.generation(&request.path) == request.generation;
        let entry = library
            .entry_mut(&request.path)
            .filter(|e| current && e.page == request.page);
        let batch = self.request_batches.remove(&request.id);

        let outcome = match result {
            Ok(thumbnail) => {
                let thumbnail = Arc::new(thumbnail);
                self.memo.insert(request.key.clone(), Arc::clone(&thumbnail));
                if let Some(entry) = entry {
                    entry.status = ThumbnailStatus::Cached;
                    entry.page_used = Some(thumbnail.page_used);
                }
                self.events.push_back(ThumbnailEvent::Ready {
                    path: request.path.clone(),
                    page: request.page,
                    thumbnail,
                });
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                if let Some(entry) = entry {
                    entry.status = ThumbnailStatus::Failed {
                        reason: reason.clone(),
                    };
                    entry.page_used = None;
                }
                let event = self.failed_event(&request.path, request.page, reason.clone());
                self.events.push_back(event);
                Err(reason)
            }
        };

        if let Some(batch) = batch {
            self.record_batch_outcome(batch, request.path, outcome);
        }
    }

    fn record_batch_outcome(&mut self, id: BatchId, path: PathBuf, outcome: Result<(), String>) {
        let Some(state) = self.batches.get_mut(&id) else {
            return;
        };
        match outcome {
            Ok(()) => state.succeeded += 1,
            Err(reason) => state.failures.push(BatchFailure { path, reason }),
        }
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding > 0 {
            return;
        }
        if let Some(state) = self.batches.remove(&id) {
            let report = state.into_report(id);
            if report.is_clean() {
                info!("Page {} applied to {} files", report.page, report.succeeded);
            } else {
                warn!(
                    "Page {} applied to {} files, {} failed",
                    report.page,
                    report.succeeded,
                    report.failures.len()
                );
            }
            self.events.push_back(ThumbnailEvent::BatchFinished(report));
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn enqueue(
        &mut self,
        path: &Path,
        key: CacheKey,
        page: PageIndex,
        target: ThumbnailSize,
        generation: u64,
        batch: Option<BatchId>,
    ) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;

        if self.progress.is_done() {
            self.progress = Progress::default();
        }
        self.progress.total += 1;

        self.in_flight.insert(key.clone(), id);
        if let Some(batch) = batch {
            self.request_batches.insert(id, batch);
        }

        let request = RenderRequest {
            id,
            path: path.to_path_buf(),
            key,
            page,
            target,
            epoch: self.worker.epoch(),
            generation,
        };
        if !self.worker.submit(Job::Render(request)) {
            // Worker gone: fail the request so nothing waits on it forever
            let placeholder = Arc::new(Thumbnail::placeholder(target, page));
            self.in_flight.retain(|_, pending| *pending != id);
            self.progress.completed += 1;
            self.events.push_back(ThumbnailEvent::Failed {
                path: path.to_path_buf(),
                page,
                reason: "thumbnail worker stopped".to_string(),
                placeholder,
            });
            if let Some(batch) = self.request_batches.remove(&id) {
                self.record_batch_outcome(
                    batch,
                    path.to_path_buf(),
                    Err("thumbnail worker stopped".to_string()),
                );
            }
        }
        id
    }

    fn generation(&self, path: &Path) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }

    fn bump_generation(&mut self, path: &Path) -> u64 {
        let generation = self.generations.entry(path.to_path_buf()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn failed_event(&self, path: &Path, page: PageIndex, reason: String) -> ThumbnailEvent {
        ThumbnailEvent::Failed {
            path: path.to_path_buf(),
            page,
            reason,
            placeholder: Arc::new(Thumbnail::placeholder(self.target, page)),
        }
    }
}
