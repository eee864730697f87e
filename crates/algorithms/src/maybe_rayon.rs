//! Optional rayon parallelism.
//!
//! With the `parallel` feature the per-feature work of a join runs on the
//! rayon thread pool; without it the same closure runs sequentially.

/// Evaluate `f` for every index in `0..n`, keeping index order in the output
#[cfg(feature = "parallel")]
pub(crate) fn map_indices<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;
    (0..n).into_par_iter().map(f).collect()
}

/// Evaluate `f` for every index in `0..n`, keeping index order in the output
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_indices<T, F>(n: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..n).map(f).collect()
}
