//! Scatter-gather over independent pure computations.

use rayon::prelude::*;

/// Apply `f` to every item in parallel and collect the results in input
/// order.
pub fn scatter_gather<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(f).collect()
}
