//! Shared thread pool for running experiment combinations and trials.
//!
//! Combinations fan out over the pool and each combination fans its trials
//! out again, so the nesting depth is fixed at two. The pool uses larger
//! stacks than rayon's default to keep that headroom on small-stack targets.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

#[cfg(feature = "parallel")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
static THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Get or initialize the shared pool.
///
/// - Stack size: 8 MB (vs rayon's default 2 MB)
/// - Thread count: number of logical CPUs
///
/// Returns `None` if the pool could not be built; callers then fall back to
/// rayon's global pool.
#[cfg(feature = "parallel")]
pub fn get_thread_pool() -> Option<&'static ThreadPool> {
    THREAD_POOL
        .get_or_init(|| {
            rayon::ThreadPoolBuilder::new()
                .stack_size(8 * 1024 * 1024)
                .thread_name(|i| format!("noisy-rank-{i}"))
                .build()
                .map_err(|err| tracing::warn!(%err, "falling back to the global rayon pool"))
                .ok()
        })
        .as_ref()
}

/// Execute a parallel operation inside the shared pool.
#[cfg(feature = "parallel")]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Without the `parallel` feature, run `op` on the calling thread.
#[cfg(not(feature = "parallel"))]
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R,
{
    op()
}
