//! Single background thread that renders thumbnails and writes the cache.
//!
//! Jobs are serviced strictly first-in-first-out. Results are pushed onto a
//! shared queue that the UI thread drains on its own tick, so the UI never
//! blocks on a render.
//!
//! Cancellation is epoch based: bumping the epoch makes queued jobs of the
//! old epoch get skipped. A render already running is not interrupted; its
//! result still carries the old epoch and is dropped by the receiver.
//!
//! A renderer panic is caught and reported as a failed render; the thread
//! keeps servicing the queue.

use crate::cache::{CacheKey, CacheStore, RecordMeta};
use crate::error::{CacheError, CacheResult};
use crate::pdf::PageRenderer;
use crate::types::{PageIndex, Thumbnail, ThumbnailSize, ThumbnailSource};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Identifier of a submitted render request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// One thumbnail to render and store
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub id: RequestId,
    pub path: PathBuf,
    pub key: CacheKey,
    pub page: PageIndex,
    pub target: ThumbnailSize,
    /// Library epoch the request belongs to
    pub epoch: u64,
    /// Per-file generation at submit time; later `apply_page` calls bump it
    pub generation: u64,
}

#[derive(Debug)]
pub enum Job {
    Render(RenderRequest),
    /// Remove every record from the store
    Clear { epoch: u64 },
}

/// Result posted back to the UI thread
#[derive(Debug)]
pub enum WorkerOutput {
    Rendered {
        request: RenderRequest,
        result: CacheResult<Thumbnail>,
    },
    Cleared {
        epoch: u64,
        result: CacheResult<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running(RequestId),
    /// Removing every record from the store
    Clearing,
    Stopped,
}

/// Results queue shared between the worker and the UI thread
#[derive(Default)]
struct Outbox {
    queue: Mutex<VecDeque<WorkerOutput>>,
    ready: Condvar,
}

impl Outbox {
    fn push(&self, output: WorkerOutput) {
        self.queue.lock().push_back(output);
        self.ready.notify_all();
    }
}

/// Handle to the thumbnail worker thread.
///
/// Dropping the handle closes the job queue and joins the thread.
pub struct ThumbnailWorker {
    jobs: Option<Sender<Job>>,
    outbox: Arc<Outbox>,
    state: Arc<Mutex<WorkerState>>,
    epoch: Arc<AtomicU64>,
    queued: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl ThumbnailWorker {
    /// Start the worker thread. The renderer and store are used only on that thread
    /// (the store may still be read elsewhere).
    pub fn spawn(store: Arc<CacheStore>, renderer: Box<dyn PageRenderer>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let outbox = Arc::new(Outbox::default());
        let state = Arc::new(Mutex::new(WorkerState::Idle));
        let epoch = Arc::new(AtomicU64::new(0));
        let queued = Arc::new(AtomicUsize::new(0));

        let context = WorkerContext {
            store,
            renderer,
            outbox: Arc::clone(&outbox),
            state: Arc::clone(&state),
            epoch: Arc::clone(&epoch),
            queued: Arc::clone(&queued),
        };
        let handle = std::thread::Builder::new()
            .name("thumbnail-worker".into())
            .spawn(move || context.run(rx))?;

        Ok(Self {
            jobs: Some(tx),
            outbox,
            state,
            epoch,
            queued,
            handle: Some(handle),
        })
    }

    /// Queue a job. Returns false if the worker has stopped.
    pub fn submit(&self, job: Job) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        self.queued.fetch_add(1, Ordering::SeqCst);
        if jobs.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            warn!("Thumbnail worker is gone; job dropped");
            return false;
        }
        true
    }

    /// Take every result posted so far. Never blocks on the worker.
    pub fn drain(&self) -> Vec<WorkerOutput> {
        self.outbox.queue.lock().drain(..).collect()
    }

    /// Block until at least one result is available or `timeout` passes.
    ///
    /// For headless runs and tests; a UI thread should poll `drain` instead.
    pub fn wait_for_output(&self, timeout: Duration) -> bool {
        let mut queue = self.outbox.queue.lock();
        if queue.is_empty() {
            let _ = self.outbox.ready.wait_for(&mut queue, timeout);
        }
        !queue.is_empty()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Jobs submitted but not yet finished (or skipped)
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.queued() == 0
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate everything submitted so far. Returns the new epoch.
    pub fn cancel_pending(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Thumbnail worker moved to epoch {}", epoch);
        epoch
    }
}

impl Drop for ThumbnailWorker {
    fn drop(&mut self) {
        self.cancel_pending();
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Thumbnail worker panicked");
            }
        }
    }
}

/// Everything the worker thread owns
struct WorkerContext {
    store: Arc<CacheStore>,
    renderer: Box<dyn PageRenderer>,
    outbox: Arc<Outbox>,
    state: Arc<Mutex<WorkerState>>,
    epoch: Arc<AtomicU64>,
    queued: Arc<AtomicUsize>,
}

impl WorkerContext {
    fn run(self, jobs: Receiver<Job>) {
        info!("Thumbnail worker started");
        while let Ok(job) = jobs.recv() {
            self.handle(job);
            self.queued.fetch_sub(1, Ordering::SeqCst);
            *self.state.lock() = WorkerState::Idle;
        }
        *self.state.lock() = WorkerState::Stopped;
        info!("Thumbnail worker stopped");
    }

    fn handle(&self, job: Job) {
        let current = self.epoch.load(Ordering::SeqCst);
        match job {
            Job::Render(request) => {
                if request.epoch != current {
                    debug!("Skipping cancelled request for {}", request.path.display());
                    return;
                }
                *self.state.lock() = WorkerState::Running(request.id);
                let result = self.render_and_store(&request);
                if let Err(e) = &result {
                    warn!("Thumbnail for {} failed: {}", request.path.display(), e);
                }
                self.outbox.push(WorkerOutput::Rendered { request, result });
            }
            Job::Clear { epoch } => {
                *self.state.lock() = WorkerState::Clearing;
                let result = self.store.clear();
                self.outbox.push(WorkerOutput::Cleared { epoch, result });
            }
        }
    }

    fn render_and_store(&self, request: &RenderRequest) -> CacheResult<Thumbnail> {
        let render = || {
            self.renderer
                .render_page(&request.path, request.page, request.target)
        };
        let rendered = match panic::catch_unwind(AssertUnwindSafe(render)) {
            Ok(result) => result?,
            Err(payload) => {
                error!("Renderer panicked on {}", request.path.display());
                return Err(CacheError::Corrupt(format!(
                    "{}: renderer panicked: {}",
                    request.path.display(),
                    panic_message(payload.as_ref())
                )));
            }
        };
        let meta = RecordMeta::new(
            &request.path,
            request.page,
            rendered.page_used,
            rendered.page_count,
            &rendered.image,
        );
        self.store.write(&request.key, &rendered.image, &meta)?;
        Ok(Thumbnail {
            image: rendered.image,
            requested_page: request.page,
            page_used: rendered.page_used,
            source: ThumbnailSource::Rendered,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
