//! Cache configuration.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::eviction::EvictionPolicy;
use crate::similarity::{Similarity, SimilarityFn};

/// Resolved configuration a cache is built from.
pub(crate) struct Options<K> {
    pub(crate) num_shards: usize,
    pub(crate) max_size: usize,
    pub(crate) threshold: f64,
    pub(crate) eviction: Option<Arc<dyn EvictionPolicy<K>>>,
    pub(crate) ttl: Duration,
    pub(crate) enable_stats: bool,
}

impl<K> Default for Options<K> {
    fn default() -> Self {
        Self {
            num_shards: 16,
            max_size: 1000,
            threshold: 0.8,
            eviction: None,
            ttl: Duration::ZERO,
            enable_stats: false,
        }
    }
}

/// Fluent configuration for [`Cache`].
///
/// Out-of-range values are silently ignored and the previous (or default)
/// value is kept, so a misconfigured caller still gets a working cache.
/// Each setter documents its accepted range.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use simcache::prelude::*;
///
/// let cache: Cache<String, u32> = Cache::builder()
///     .shards(8)
///     .max_size(10_000)
///     .threshold(0.7)
///     .ttl(Duration::from_secs(300))
///     .enable_stats(true)
///     .build();
/// assert!(cache.is_empty());
/// ```
pub struct CacheBuilder<K, V> {
    options: Options<K>,
    similarity: Option<Arc<SimilarityFn<K>>>,
    _value: PhantomData<V>,
}

impl<K, V> CacheBuilder<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            options: Options::default(),
            similarity: None,
            _value: PhantomData,
        }
    }

    /// Number of shards. Accepted iff `1..=256`; default 16.
    pub fn shards(mut self, count: usize) -> Self {
        if (1..=256).contains(&count) {
            self.options.num_shards = count;
        }
        self
    }

    /// Total capacity across all shards. Accepted iff non-zero; default
    /// 1000.
    pub fn max_size(mut self, size: usize) -> Self {
        if size > 0 {
            self.options.max_size = size;
        }
        self
    }

    /// Minimum similarity score for [`Cache::get_similar`] matches.
    /// Accepted iff within `0.0..=1.0`; default 0.8.
    pub fn threshold(mut self, threshold: f64) -> Self {
        if (0.0..=1.0).contains(&threshold) {
            self.options.threshold = threshold;
        }
        self
    }

    /// Eviction policy shared by every shard. Without one, shards fall
    /// back to FIFO eviction over their insertion order.
    pub fn eviction(mut self, policy: Arc<dyn EvictionPolicy<K>>) -> Self {
        self.options.eviction = Some(policy);
        self
    }

    /// Per-entry time-to-live. Zero (the default) disables expiry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl = ttl;
        self
    }

    /// Enables per-shard statistics counters; default off. When off,
    /// [`Cache::stats`] returns all zeroes.
    pub fn enable_stats(mut self, enabled: bool) -> Self {
        self.options.enable_stats = enabled;
        self
    }

    /// Installs the similarity function used by [`Cache::get_similar`].
    pub fn similarity(mut self, func: impl Fn(&K, &K) -> f64 + Send + Sync + 'static) -> Self {
        self.similarity = Some(Arc::new(func));
        self
    }

    /// Installs a [`Similarity`] capability object: its function becomes
    /// the similarity function and its threshold is applied through the
    /// same validation as [`threshold`](Self::threshold).
    pub fn similarity_scorer(mut self, scorer: impl Similarity<K> + 'static) -> Self {
        self = self.threshold(scorer.threshold());
        self.similarity = Some(Arc::new(move |a: &K, b: &K| scorer.score(a, b)));
        self
    }
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Builds the cache. Per-shard capacity is
    /// `max(1, max_size / shards)`.
    pub fn build(self) -> Cache<K, V> {
        Cache::from_parts(self.options, self.similarity)
    }
}
