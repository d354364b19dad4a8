//! A self-contained cache partition.
//!
//! Each shard owns a read-write lock over its entry map and an
//! insertion-order key list used for similarity iteration and FIFO
//! fallback eviction. Exact operations touch one shard; similarity search
//! scans the shard linearly under its read lock.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::cache::SimilarMatch;
use crate::context::Context;
use crate::entry::Entry;
use crate::error::{CacheError, Result};
use crate::eviction::EvictionPolicy;
use crate::similarity::SimilarityFn;
use crate::stats::{ShardStats, Stats};

/// Map key scoping an entry to the namespace it was created under.
///
/// Entries created under different namespaces coexist independently even
/// when their logical keys collide.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ScopedKey<K> {
    namespace: String,
    key: K,
}

struct ShardState<K, V> {
    entries: FxHashMap<ScopedKey<K>, Entry<K, V>>,
    /// Insertion order; drives similarity iteration and FIFO fallback.
    order: Vec<ScopedKey<K>>,
}

pub(crate) struct Shard<K, V> {
    state: RwLock<ShardState<K, V>>,
    policy: Option<Arc<dyn EvictionPolicy<K>>>,
    max_size: usize,
    threshold: f64,
    ttl: Duration,
    stats: Option<ShardStats>,
}

impl<K, V> Shard<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(
        max_size: usize,
        threshold: f64,
        ttl: Duration,
        policy: Option<Arc<dyn EvictionPolicy<K>>>,
        enable_stats: bool,
    ) -> Self {
        Self {
            state: RwLock::new(ShardState {
                entries: FxHashMap::default(),
                order: Vec::new(),
            }),
            policy,
            max_size,
            threshold,
            ttl,
            stats: enable_stats.then(ShardStats::default),
        }
    }

    pub(crate) fn get(&self, ctx: &Context, key: &K) -> Option<V> {
        let state = self.state.read();
        if ctx.is_cancelled() {
            return None;
        }

        let scoped = ScopedKey {
            namespace: ctx.namespace().to_owned(),
            key: key.clone(),
        };
        let Some(entry) = state.entries.get(&scoped) else {
            if let Some(stats) = &self.stats {
                stats.record_miss();
            }
            return None;
        };

        if entry.is_expired() {
            if let Some(stats) = &self.stats {
                stats.record_expired();
                stats.record_miss();
            }
            return None;
        }

        entry.touch();
        if let Some(policy) = &self.policy {
            policy.on_access(key);
        }
        if let Some(stats) = &self.stats {
            stats.record_hit();
        }
        Some(entry.value().clone())
    }

    pub(crate) fn get_similar(
        &self,
        ctx: &Context,
        query: &K,
        similarity: Option<&SimilarityFn<K>>,
    ) -> Option<SimilarMatch<K, V>> {
        let state = self.state.read();
        if ctx.is_cancelled() {
            return None;
        }
        if let Some(stats) = &self.stats {
            stats.record_similar_search();
        }

        let similarity = similarity?;
        let namespace = ctx.namespace();

        let mut best: Option<&ScopedKey<K>> = None;
        let mut best_score = 0.0_f64;
        for scoped in &state.order {
            let Some(entry) = state.entries.get(scoped) else {
                continue;
            };
            if !namespace.is_empty() && entry.namespace() != namespace {
                continue;
            }
            if entry.is_expired() {
                continue;
            }
            if ctx.is_cancelled() {
                return None;
            }

            let score = similarity(query, &scoped.key);
            if score >= self.threshold && score > best_score {
                best = Some(scoped);
                best_score = score;
            }
        }

        let scoped = best?;
        let entry = state.entries.get(scoped)?;
        entry.touch();
        if let Some(policy) = &self.policy {
            policy.on_access(&scoped.key);
        }
        if let Some(stats) = &self.stats {
            stats.record_similar_hit();
        }
        Some(SimilarMatch {
            key: scoped.key.clone(),
            value: entry.value().clone(),
            score: best_score,
        })
    }

    pub(crate) fn set(&self, ctx: &Context, key: K, value: V) -> Result<()> {
        let mut state = self.state.write();
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        let namespace = ctx.namespace().to_owned();
        let scoped = ScopedKey {
            namespace: namespace.clone(),
            key,
        };

        if let Some(entry) = state.entries.get_mut(&scoped) {
            entry.replace_value(value);
            entry.touch();
            if let Some(policy) = &self.policy {
                policy.on_access(&scoped.key);
            }
            if let Some(stats) = &self.stats {
                stats.record_set();
            }
            return Ok(());
        }

        if self.max_size > 0 && state.entries.len() >= self.max_size {
            self.evict(&mut state);
        }

        let entry = Entry::new(
            scoped.key.clone(),
            value,
            self.ttl,
            namespace,
            ctx.metadata_map(),
        );
        let access_count = entry.access_count();
        let created_at = entry.created_at();
        let accessed_at = entry.accessed_at();

        state.entries.insert(scoped.clone(), entry);
        if let Some(policy) = &self.policy {
            policy.on_add(&scoped.key, access_count, created_at, accessed_at);
        }
        state.order.push(scoped);

        if let Some(stats) = &self.stats {
            stats.record_set();
        }
        Ok(())
    }

    pub(crate) fn delete(&self, ctx: &Context, key: &K) -> bool {
        let mut state = self.state.write();
        if ctx.is_cancelled() {
            return false;
        }

        let scoped = ScopedKey {
            namespace: ctx.namespace().to_owned(),
            key: key.clone(),
        };
        if state.entries.remove(&scoped).is_none() {
            return false;
        }
        if let Some(pos) = state.order.iter().position(|sk| *sk == scoped) {
            state.order.remove(pos);
        }

        if let Some(policy) = &self.policy {
            policy.on_remove(key);
        }
        if let Some(stats) = &self.stats {
            stats.record_delete();
        }
        true
    }

    /// Removes one entry to make room. With no policy, the oldest
    /// insertion goes; otherwise the policy's victim. A policy with no
    /// suggestion leaves the shard transiently over capacity.
    fn evict(&self, state: &mut ShardState<K, V>) {
        let Some(policy) = &self.policy else {
            if state.order.is_empty() {
                return;
            }
            let victim = state.order.remove(0);
            state.entries.remove(&victim);
            if let Some(stats) = &self.stats {
                stats.record_eviction();
            }
            trace!("evicted oldest entry (no policy)");
            return;
        };

        let Some(victim) = policy.select_victim() else {
            return;
        };

        let Some(pos) = state.order.iter().position(|sk| sk.key == victim) else {
            // Tracked by the shared policy but not resident in this shard;
            // untrack it so selection can move on.
            policy.on_remove(&victim);
            return;
        };
        let scoped = state.order.remove(pos);
        state.entries.remove(&scoped);
        policy.on_remove(&victim);
        if let Some(stats) = &self.stats {
            stats.record_eviction();
        }
        trace!("evicted policy victim");
    }

    pub(crate) fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub(crate) fn stats_snapshot(&self) -> Stats {
        self.stats
            .as_ref()
            .map(ShardStats::snapshot)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::Lru;

    fn shard(max_size: usize) -> Shard<String, i32> {
        Shard::new(max_size, 0.8, Duration::ZERO, None, true)
    }

    #[test]
    fn namespaced_entries_coexist_under_one_key() {
        let s = shard(10);
        let ns_a = Context::background().with_namespace("a");
        let ns_b = Context::background().with_namespace("b");

        s.set(&ns_a, "x".into(), 1).unwrap();
        s.set(&ns_b, "x".into(), 2).unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(s.get(&ns_a, &"x".into()), Some(1));
        assert_eq!(s.get(&ns_b, &"x".into()), Some(2));
    }

    #[test]
    fn fifo_fallback_evicts_oldest() {
        let s = shard(2);
        let ctx = Context::background();

        s.set(&ctx, "a".into(), 1).unwrap();
        s.set(&ctx, "b".into(), 2).unwrap();
        s.set(&ctx, "c".into(), 3).unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(s.get(&ctx, &"a".into()), None);
        assert_eq!(s.get(&ctx, &"b".into()), Some(2));
        assert_eq!(s.get(&ctx, &"c".into()), Some(3));
        assert_eq!(s.stats_snapshot().evictions, 1);
    }

    #[test]
    fn policy_victim_absent_from_shard_is_untracked_not_counted() {
        let policy: Arc<Lru<String>> = Arc::new(Lru::new());
        let s: Shard<String, i32> = Shard::new(
            1,
            0.8,
            Duration::ZERO,
            Some(Arc::clone(&policy) as Arc<dyn EvictionPolicy<String>>),
            true,
        );
        let ctx = Context::background();

        // Track a foreign key, as if it lived in a sibling shard.
        let now = std::time::SystemTime::now();
        policy.on_add(&"foreign".to_string(), 0, now, now);

        s.set(&ctx, "mine".into(), 1).unwrap();
        // Full shard: the next insert selects "foreign", finds it absent,
        // untracks it and proceeds over capacity.
        s.set(&ctx, "next".into(), 2).unwrap();

        assert_eq!(s.len(), 2);
        assert_eq!(s.stats_snapshot().evictions, 0);
        assert_eq!(s.get(&ctx, &"mine".into()), Some(1));
        assert_eq!(s.get(&ctx, &"next".into()), Some(2));
    }

    #[test]
    fn overwrite_does_not_grow_or_evict() {
        let s = shard(1);
        let ctx = Context::background();

        s.set(&ctx, "a".into(), 1).unwrap();
        s.set(&ctx, "a".into(), 2).unwrap();

        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&ctx, &"a".into()), Some(2));
        assert_eq!(s.stats_snapshot().evictions, 0);
        assert_eq!(s.stats_snapshot().sets, 2);
    }

    #[test]
    fn cancelled_context_blocks_mutation() {
        let s = shard(10);
        let ctx = Context::background();
        s.set(&ctx, "a".into(), 1).unwrap();

        let (cancelled, handle) = ctx.with_cancel();
        handle.cancel();

        assert_eq!(s.set(&cancelled, "b".into(), 2), Err(CacheError::Cancelled));
        assert!(!s.delete(&cancelled, &"a".into()));
        assert_eq!(s.get(&cancelled, &"a".into()), None);
        assert_eq!(s.len(), 1);
    }
}
