//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated cache statistics snapshot.
///
/// Returned by [`Cache::stats`](crate::Cache::stats). All fields are zero
/// when statistics were not enabled at construction. The snapshot is not
/// atomic across shards: counters read from different shards may reflect
/// slightly different points in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Exact lookups that returned a live entry.
    pub hits: u64,
    /// Exact lookups that found nothing (absent, namespace-scoped miss, or
    /// expired).
    pub misses: u64,
    /// Successful inserts and overwrites.
    pub sets: u64,
    /// Successful deletions.
    pub deletes: u64,
    /// Similarity searches performed (one per shard scanned).
    pub similar_searches: u64,
    /// Similarity searches that produced a match.
    pub similar_hits: u64,
    /// Entries removed to make room for new insertions.
    pub evictions: u64,
    /// Lookups that found an entry past its expiry.
    pub expired: u64,
}

impl Stats {
    pub(crate) fn merge(&mut self, other: Stats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.sets += other.sets;
        self.deletes += other.deletes;
        self.similar_searches += other.similar_searches;
        self.similar_hits += other.similar_hits;
        self.evictions += other.evictions;
        self.expired += other.expired;
    }
}

/// Per-shard counters. Plain atomics so hits can be recorded under the
/// shard's read lock.
#[derive(Debug, Default)]
pub(crate) struct ShardStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    similar_searches: AtomicU64,
    similar_hits: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
}

impl ShardStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_similar_search(&self) {
        self.similar_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_similar_hit(&self) {
        self.similar_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            similar_searches: self.similar_searches.load(Ordering::Relaxed),
            similar_hits: self.similar_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
