// src/engine/tasks.rs
//
// Background render tasks and atomic file writes.
//
// Resize requests run on the shared pool. Every request carries a
// sequence number from a monotonic counter; completions are handed back
// through RenderQueue::drain, which only applies a result newer than the
// last one applied. There is no cancellation: a slow, superseded request
// still finishes, and its result is dropped.

use crate::engine::common::run_with_panic_policy;
use crate::engine::pipeline;
use crate::engine::pool;
use crate::error::{ResizerError, Result};
use crate::ops::{Dimensions, ResampleFilter};
use crate::raster::Raster;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::debug;

/// Sequence number of a render request. Later requests compare greater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resize to render off the calling thread.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub source: Raster,
    pub target: Dimensions,
    pub filter: ResampleFilter,
}

impl RenderJob {
    /// Run the job on the current thread.
    pub fn run(&self) -> Result<Raster> {
        run_with_panic_policy("render", || {
            pipeline::resize_to(&self.source, self.target, self.filter)
        })
    }
}

/// A finished render request.
#[derive(Debug)]
pub struct RenderOutcome {
    pub id: RequestId,
    pub result: Result<Raster>,
}

#[derive(Default)]
struct Shared {
    completed: Vec<RenderOutcome>,
    in_flight: usize,
}

/// Submits render jobs to the worker pool and hands back fresh results.
pub struct RenderQueue {
    next_id: u64,
    last_applied: u64,
    shared: Arc<(Mutex<Shared>, Condvar)>,
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            last_applied: 0,
            shared: Arc::new((Mutex::new(Shared::default()), Condvar::new())),
        }
    }

    /// Queue `job` on the worker pool.
    pub fn submit(&mut self, job: RenderJob) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.shared.0.lock().in_flight += 1;

        debug!(target: "image_resizer::render", %id, target = %job.target, "submitted");

        let shared = Arc::clone(&self.shared);
        pool::spawn(move || {
            let started = Instant::now();
            let result = job.run();
            debug!(
                target: "image_resizer::render",
                %id,
                ok = result.is_ok(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "finished"
            );
            let (lock, cond) = &*shared;
            let mut state = lock.lock();
            state.completed.push(RenderOutcome { id, result });
            state.in_flight -= 1;
            cond.notify_all();
        });
        id
    }

    /// Deliver completed results, newest first. A result is passed to
    /// `apply` only if it is newer than every result applied before it;
    /// the rest are dropped. Returns how many results were applied.
    pub fn drain<F>(&mut self, mut apply: F) -> usize
    where
        F: FnMut(RenderOutcome),
    {
        let mut completed = std::mem::take(&mut self.shared.0.lock().completed);
        completed.sort_by(|a, b| b.id.cmp(&a.id));

        let mut applied = 0;
        for outcome in completed {
            if outcome.id.0 > self.last_applied {
                self.last_applied = outcome.id.0;
                apply(outcome);
                applied += 1;
            } else {
                debug!(
                    target: "image_resizer::render",
                    id = %outcome.id,
                    last_applied = self.last_applied,
                    "dropping stale result"
                );
            }
        }
        applied
    }

    /// Requests submitted but not finished yet.
    pub fn in_flight(&self) -> usize {
        self.shared.0.lock().in_flight
    }

    /// Most recently issued id, if any.
    pub fn latest(&self) -> Option<RequestId> {
        (self.next_id > 0).then_some(RequestId(self.next_id))
    }

    /// Block until every submitted job has finished or `timeout` elapses.
    /// Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cond) = &*self.shared;
        let mut state = lock.lock();
        while state.in_flight > 0 {
            if cond.wait_until(&mut state, deadline).timed_out() {
                return state.in_flight == 0;
            }
        }
        true
    }
}

/// Write `data` to `path` atomically: a temp file in the same directory is
/// written, synced, then renamed over the target. Returns bytes written.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<u64> {
    let display = path.to_string_lossy().into_owned();
    let output_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    // Same directory as the target so the rename never crosses filesystems.
    let mut temp_file = NamedTempFile::new_in(output_dir).map_err(|e| {
        ResizerError::file_write_failed(output_dir.to_string_lossy().into_owned(), e)
    })?;
    let temp_path = temp_file.path().to_path_buf();

    temp_file
        .write_all(data)
        .map_err(|e| ResizerError::file_write_failed(temp_path.display().to_string(), e))?;
    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| ResizerError::file_write_failed(temp_path.display().to_string(), e))?;

    // tempfile removes the temp file if the rename fails
    temp_file
        .persist(path)
        .map_err(|e| ResizerError::file_write_failed(display, e.error))?;

    debug!(target: "image_resizer::io", path = %path.display(), bytes = data.len(), "written");
    Ok(data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(30);

    fn source(width: u32, height: u32) -> Raster {
        Raster::filled(width, height, [200, 100, 50, 255]).unwrap()
    }

    fn resize_job(src: &Raster, w: u32, h: u32) -> RenderJob {
        RenderJob {
            source: src.clone(),
            target: Dimensions::new(w, h).unwrap(),
            filter: ResampleFilter::default(),
        }
    }

    mod render_queue_tests {
        use super::*;

        #[test]
        fn ids_are_monotonic() {
            let mut queue = RenderQueue::new();
            let src = source(8, 8);
            let a = queue.submit(resize_job(&src, 4, 4));
            let b = queue.submit(resize_job(&src, 2, 2));
            assert!(b > a);
            assert_eq!(queue.latest(), Some(b));
            assert!(queue.wait_idle(WAIT));
        }

        #[test]
        fn only_newest_result_is_applied() {
            let mut queue = RenderQueue::new();
            let src = source(64, 64);
            queue.submit(resize_job(&src, 32, 32));
            queue.submit(resize_job(&src, 16, 16));
            let newest = queue.submit(resize_job(&src, 8, 8));
            assert!(queue.wait_idle(WAIT));

            let mut seen = Vec::new();
            let applied = queue.drain(|outcome| seen.push(outcome));
            assert_eq!(applied, 1);
            assert_eq!(seen[0].id, newest);
            let raster = seen[0].result.as_ref().unwrap();
            assert_eq!((raster.width(), raster.height()), (8, 8));
        }

        #[test]
        fn late_stale_completion_is_dropped() {
            let mut queue = RenderQueue::new();
            let src = source(32, 32);
            queue.submit(resize_job(&src, 20, 20));
            assert!(queue.wait_idle(WAIT));

            // Pretend a later request already landed.
            queue.last_applied = 5;
            let applied = queue.drain(|_| panic!("stale result applied"));
            assert_eq!(applied, 0);
        }

        #[test]
        fn same_size_job_hands_back_source() {
            let mut queue = RenderQueue::new();
            let src = source(10, 10);
            let id = queue.submit(resize_job(&src, 10, 10));
            assert!(queue.wait_idle(WAIT));
            let mut results = Vec::new();
            queue.drain(|outcome| results.push(outcome));
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].id, id);
            assert!(results[0].result.as_ref().unwrap().shares_storage(&src));
        }

        #[test]
        fn idle_queue_drains_nothing() {
            let mut queue = RenderQueue::new();
            assert!(queue.wait_idle(Duration::from_millis(1)));
            assert_eq!(queue.in_flight(), 0);
            assert_eq!(queue.drain(|_| {}), 0);
            assert_eq!(queue.latest(), None);
        }
    }

    mod write_tests {
        use super::*;

        #[test]
        fn write_atomic_creates_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("out.bin");
            let written = write_atomic(&path, b"payload").unwrap();
            assert_eq!(written, 7);
            assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        }

        #[test]
        fn write_atomic_replaces_existing() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("out.bin");
            std::fs::write(&path, b"old contents").unwrap();
            write_atomic(&path, b"new").unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), b"new");
            // no temp files left behind
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        }

        #[test]
        fn write_atomic_missing_dir_fails() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("missing").join("out.bin");
            let err = write_atomic(&path, b"x").unwrap_err();
            assert!(matches!(err, ResizerError::FileWriteFailed { .. }));
        }
    }
}
