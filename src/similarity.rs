//! The similarity contract and its adapters.
//!
//! A similarity function compares two keys and returns a score in
//! `[0.0, 1.0]`, where 1.0 means identical and 0.0 means maximally
//! dissimilar. The cache treats the function as opaque and invokes it under
//! a shard read lock, so implementations must be total (no panics on any
//! input) and must not call back into the cache.

use std::sync::Arc;

/// A similarity function over keys.
///
/// Must return a score in `[0.0, 1.0]`. Symmetry is recommended but not
/// required.
pub type SimilarityFn<K> = dyn Fn(&K, &K) -> f64 + Send + Sync;

/// A similarity scorer bundled with the threshold at which a candidate
/// qualifies as a match.
pub trait Similarity<K>: Send + Sync {
    /// Computes the similarity score between two keys, in `[0.0, 1.0]`.
    fn score(&self, a: &K, b: &K) -> f64;

    /// The minimum score at which a candidate may be returned.
    fn threshold(&self) -> f64;
}

/// Adapter binding a plain function and a threshold into a [`Similarity`]
/// capability object.
///
/// # Examples
///
/// ```rust
/// use simcache::distance::levenshtein;
/// use simcache::similarity::{FnSimilarity, Similarity};
///
/// let sim = FnSimilarity::new(|a: &String, b: &String| levenshtein(a, b), 0.7);
/// assert_eq!(sim.threshold(), 0.7);
/// assert_eq!(sim.score(&"abc".to_string(), &"abc".to_string()), 1.0);
/// ```
pub struct FnSimilarity<K> {
    func: Arc<SimilarityFn<K>>,
    threshold: f64,
}

impl<K> FnSimilarity<K> {
    /// Binds `func` and `threshold` together.
    pub fn new(func: impl Fn(&K, &K) -> f64 + Send + Sync + 'static, threshold: f64) -> Self {
        Self {
            func: Arc::new(func),
            threshold,
        }
    }
}

impl<K> Clone for FnSimilarity<K> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
            threshold: self.threshold,
        }
    }
}

impl<K> Similarity<K> for FnSimilarity<K>
where
    K: Send + Sync,
{
    fn score(&self, a: &K, b: &K) -> f64 {
        (self.func)(a, b)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}
