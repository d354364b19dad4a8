//! The cache facade: construction, key routing and cross-shard search.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::options::{CacheBuilder, Options};
use crate::shard::Shard;
use crate::similarity::SimilarityFn;
use crate::stats::Stats;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a as a [`Hasher`], fed by the key's [`Hash`] impl. Equal
/// keys produce equal digests by the `Hash` contract, which is all shard
/// routing needs.
struct Fnv1a64 {
    hash: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            hash: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash ^= u64::from(byte);
            self.hash = self.hash.wrapping_mul(FNV_PRIME);
        }
    }
}

/// A successful similarity lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMatch<K, V> {
    /// The stored key that matched.
    pub key: K,
    /// The value stored under the matched key.
    pub value: V,
    /// Similarity between the query and the matched key, in `[0.0, 1.0]`.
    pub score: f64,
}

/// Sharded, thread-safe, in-process cache with similarity-based lookup.
///
/// Exact operations hash the key to a single shard; similarity search
/// scans every shard and returns the best-scoring candidate above the
/// configured threshold. Each shard serializes its own operations through
/// a read-write lock; there is no cache-wide lock.
///
/// # Examples
///
/// ```rust
/// use simcache::prelude::*;
///
/// let cache: Cache<String, String> = Cache::builder()
///     .threshold(0.7)
///     .build()
///     .with_similarity(|a: &String, b: &String| levenshtein(a, b));
///
/// let ctx = Context::background();
/// cache.set(&ctx, "hello".into(), "world".into()).unwrap();
///
/// assert_eq!(cache.get(&ctx, &"hello".into()), Some("world".into()));
///
/// let found = cache.get_similar(&ctx, &"helo".into()).unwrap();
/// assert_eq!(found.key, "hello");
/// assert_eq!(found.value, "world");
/// assert!(found.score >= 0.7);
/// ```
pub struct Cache<K, V> {
    shards: Vec<Shard<K, V>>,
    similarity: Option<Arc<SimilarityFn<K>>>,
    enable_stats: bool,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with default options (16 shards, 1000 entries,
    /// threshold 0.8, no TTL, no eviction policy, stats off).
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a cache. See [`CacheBuilder`].
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    pub(crate) fn from_parts(options: Options<K>, similarity: Option<Arc<SimilarityFn<K>>>) -> Self {
        let per_shard_max = (options.max_size / options.num_shards).max(1);
        let shards = (0..options.num_shards)
            .map(|_| {
                Shard::new(
                    per_shard_max,
                    options.threshold,
                    options.ttl,
                    options.eviction.clone(),
                    options.enable_stats,
                )
            })
            .collect();
        Self {
            shards,
            similarity,
            enable_stats: options.enable_stats,
        }
    }

    /// Installs the similarity function used by [`get_similar`]
    /// (fluent, consuming). Without one, similarity search never matches.
    ///
    /// Consuming `self` makes "install before sharing the cache" a
    /// compile-time property rather than caller discipline.
    ///
    /// [`get_similar`]: Self::get_similar
    pub fn with_similarity(mut self, func: impl Fn(&K, &K) -> f64 + Send + Sync + 'static) -> Self {
        self.similarity = Some(Arc::new(func));
        self
    }

    fn shard_of(&self, key: &K) -> &Shard<K, V> {
        let mut hasher = Fnv1a64::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Retrieves the value stored under `key` in the context's namespace.
    ///
    /// Returns `None` on a miss, on an expired entry, across namespaces,
    /// or when the context is cancelled.
    pub fn get(&self, ctx: &Context, key: &K) -> Option<V> {
        self.shard_of(key).get(ctx, key)
    }

    /// Stores `value` under `key`, tagged with the context's namespace.
    ///
    /// Overwrites in place if the key already exists in that namespace;
    /// otherwise inserts, evicting first if the shard is at capacity.
    ///
    /// # Errors
    ///
    /// [`CacheError::Cancelled`](crate::CacheError::Cancelled) if the
    /// context was cancelled before any mutation; the cache is unchanged.
    pub fn set(&self, ctx: &Context, key: K, value: V) -> Result<()> {
        self.shard_of(&key).set(ctx, key, value)
    }

    /// Finds the stored key most similar to `key` under the installed
    /// similarity function, provided its score reaches the configured
    /// threshold.
    ///
    /// Scans every shard in index order. Ties are broken toward the lower
    /// shard index and, within a shard, toward the earlier insertion.
    /// Cancellation mid-search returns `None`, never a partial result.
    pub fn get_similar(&self, ctx: &Context, key: &K) -> Option<SimilarMatch<K, V>> {
        let similarity = self.similarity.as_deref();

        let mut best: Option<SimilarMatch<K, V>> = None;
        for shard in &self.shards {
            if let Some(candidate) = shard.get_similar(ctx, key, similarity) {
                if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }
            if ctx.is_cancelled() {
                return None;
            }
        }
        best
    }

    /// Removes the entry stored under `key` in the context's namespace.
    ///
    /// Returns whether an entry was removed; `false` when the context is
    /// cancelled.
    pub fn delete(&self, ctx: &Context, key: &K) -> bool {
        self.shard_of(key).delete(ctx, key)
    }

    /// Total number of entries across all shards. Not an atomic snapshot:
    /// concurrent writers may be observed mid-flight.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregated statistics across all shards. All zeroes unless stats
    /// were enabled at construction.
    pub fn stats(&self) -> Stats {
        let mut total = Stats::default();
        if !self.enable_stats {
            return total;
        }
        for shard in &self.shards {
            total.merge(shard.stats_snapshot());
        }
        total
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
