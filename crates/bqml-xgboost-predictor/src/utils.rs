//! Parallelism configuration shared by the encoder and the scorer.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// Components never manage thread pools themselves; they only respect this
/// flag. The pool (if any) is owned by the [`Predictor`](crate::Predictor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if rayon pool has multiple threads, sequential otherwise)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over an indexed iterator, preserving input order in the output.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }

    #[inline]
    pub fn maybe_par_bridge_for_each<T, I, F>(self, iter: I, f: F)
    where
        T: Send,
        I: Iterator<Item = T> + Send,
        F: Fn(T) + Sync + Send,
    {
        if self.is_parallel() {
            iter.par_bridge().for_each(f);
        } else {
            iter.for_each(f);
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Build the thread pool for a thread count.
///
/// Thread count semantics:
/// - `0` = use the global rayon pool (all available cores)
/// - `1` = sequential, no pool
/// - `n > 1` = dedicated pool with exactly `n` threads
pub fn build_thread_pool(
    n_threads: usize,
) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
    if n_threads <= 1 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map(Some)
}

/// Run a closure inside `pool` when one is given, otherwise on the caller's thread.
#[inline]
pub fn run_in_pool<T: Send>(
    pool: Option<&rayon::ThreadPool>,
    parallelism: Parallelism,
    f: impl FnOnce(Parallelism) -> T + Send,
) -> T {
    match pool {
        Some(pool) => pool.install(|| f(parallelism)),
        None => f(parallelism),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallelism_from_threads() {
        assert!(!Parallelism::from_threads(1).is_parallel());
        assert!(Parallelism::from_threads(2).is_parallel());
        assert!(Parallelism::from_threads(8).is_parallel());
    }

    #[test]
    fn test_default_is_sequential() {
        assert_eq!(Parallelism::default(), Parallelism::Sequential);
    }

    #[test]
    fn test_maybe_par_map_preserves_order() {
        let result: Vec<_> = Parallelism::Sequential.maybe_par_map(0..5usize, |i| i * 2);
        assert_eq!(result, vec![0, 2, 4, 6, 8]);

        let result: Vec<_> = Parallelism::Parallel.maybe_par_map(0..1000usize, |i| i * 2);
        assert_eq!(result, (0..1000).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_build_thread_pool() {
        assert!(build_thread_pool(0).unwrap().is_none());
        assert!(build_thread_pool(1).unwrap().is_none());

        let pool = build_thread_pool(2).unwrap().expect("pool for 2 threads");
        let n = run_in_pool(Some(&pool), Parallelism::Parallel, |_| {
            rayon::current_num_threads()
        });
        assert_eq!(n, 2);
    }

    #[test]
    fn test_maybe_par_bridge_for_each() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let sum = AtomicUsize::new(0);
        Parallelism::Parallel.maybe_par_bridge_for_each(0..10usize, |i| {
            sum.fetch_add(i, Ordering::Relaxed);
        });
        assert_eq!(sum.load(Ordering::Relaxed), 45);
    }
}
