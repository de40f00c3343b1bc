//! Sequential-or-rayon iteration over exposure slices.
//!
//! Each helper consults [`AnalyticsConfig::should_parallelize`] once per call;
//! without the `parallel` feature they compile down to plain iterators.

use crate::types::AnalyticsConfig;

/// Maps `f` over `items`; the output keeps input order either way.
#[allow(unused_variables)]
pub fn maybe_parallel_map<T, U, F>(items: &[T], config: &AnalyticsConfig, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}

/// Folds `items` into per-split accumulators, then merges them with `reduce`.
///
/// `reduce` must be commutative and associative. Rayon splits the slice at
/// arbitrary points, so sums of exact decimals are safe but anything
/// order-sensitive is not.
#[allow(unused_variables)]
pub fn maybe_parallel_fold<T, U, F, R>(
    items: &[T],
    config: &AnalyticsConfig,
    identity: U,
    fold: F,
    reduce: R,
) -> U
where
    T: Sync,
    U: Send + Sync + Clone,
    F: Fn(U, &T) -> U + Sync + Send,
    R: Fn(U, U) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            return items
                .par_iter()
                .fold(|| identity.clone(), &fold)
                .reduce(|| identity.clone(), reduce);
        }
    }

    items.iter().fold(identity, fold)
}

/// Mutates every item in place.
#[allow(unused_variables)]
pub fn maybe_parallel_for_each_mut<T, F>(items: &mut [T], config: &AnalyticsConfig, f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if config.should_parallelize(items.len()) {
            items.par_iter_mut().for_each(f);
            return;
        }
    }

    items.iter_mut().for_each(f);
}
