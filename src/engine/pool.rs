// src/engine/pool.rs
//
// Global thread pool for render tasks and batch exports.
//
// A single pool is shared by every session instead of building one per
// request: threads are reused and the thread count stays predictable.
//
// Thread count:
// - IMAGE_RESIZER_THREADS when set to a positive integer
// - otherwise std::thread::available_parallelism() (respects cgroup quotas)
// - MIN_RAYON_THREADS when detection fails
//
// The pool is initialized lazily on first use; later changes to the
// environment have no effect.

use rayon::ThreadPool;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Environment variable overriding the worker count.
pub const THREADS_ENV: &str = "IMAGE_RESIZER_THREADS";

/// Minimum number of rayon threads to ensure at least some parallelism
const MIN_RAYON_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Worker count the pool is (or will be) built with.
pub fn configured_threads() -> usize {
    threads_from(std::env::var(THREADS_ENV).ok().as_deref())
}

fn threads_from(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_RAYON_THREADS)
        })
}

/// The shared pool, or None when no dedicated pool could be built
/// (callers then fall back to rayon's global pool).
pub fn get_pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = configured_threads();
            let built = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("image-resizer-{i}"))
                .build()
                .or_else(|e| {
                    warn!(
                        target: "image_resizer::pool",
                        error = %e,
                        num_threads,
                        "falling back to a minimal pool"
                    );
                    rayon::ThreadPoolBuilder::new()
                        .num_threads(MIN_RAYON_THREADS)
                        .build()
                });
            match built {
                Ok(pool) => {
                    info!(
                        target: "image_resizer::pool",
                        threads = pool.current_num_threads(),
                        "worker pool ready"
                    );
                    Some(pool)
                }
                Err(e) => {
                    warn!(target: "image_resizer::pool", error = %e, "using rayon global pool");
                    None
                }
            }
        })
        .as_ref()
}

/// Fire-and-forget work on the shared pool.
pub fn spawn<F>(job: F)
where
    F: FnOnce() + Send + 'static,
{
    match get_pool() {
        Some(pool) => pool.spawn(job),
        None => rayon::spawn(job),
    }
}

/// Run `op` inside the shared pool so nested rayon iterators use its threads.
pub fn install<R, F>(op: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match get_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}
