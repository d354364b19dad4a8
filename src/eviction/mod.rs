//! Eviction policy abstraction.
//!
//! A policy receives lifecycle callbacks for every insert, access and
//! removal, and nominates a victim when a shard reaches capacity. A single
//! policy instance is shared by every shard of a cache, so implementations
//! synchronize internally: the shard lock only covers the shard's own map,
//! never policy state.
//!
//! # Available policies
//!
//! - [`Lru`]: least-recently-used, O(1) callbacks
//! - [`TtlPolicy`]: nominates expired keys, with a background sweeper
//! - [`CombinedPolicy`]: fans callbacks out to an ordered list of
//!   sub-policies
//!
//! A cache built without a policy falls back to FIFO eviction over each
//! shard's insertion order.

use std::sync::Arc;
use std::time::SystemTime;

pub mod lru;
pub mod ttl;

pub use lru::Lru;
pub use ttl::TtlPolicy;

/// Lifecycle callbacks and victim selection for bounded shards.
///
/// Implementations must be internally synchronized: callbacks arrive
/// concurrently from every shard of the owning cache.
pub trait EvictionPolicy<K>: Send + Sync {
    /// Called after every exact or similarity hit on `key`.
    fn on_access(&self, key: &K);

    /// Called after `key` is inserted, with the entry's initial access
    /// count and timestamps.
    fn on_add(&self, key: &K, access_count: u64, created_at: SystemTime, accessed_at: SystemTime);

    /// Called after `key` is deleted or evicted.
    fn on_remove(&self, key: &K);

    /// Nominates a key to evict. `None` means the policy has no
    /// suggestion, in which case the shard tolerates transient overflow.
    fn select_victim(&self) -> Option<K>;

    /// Number of keys currently tracked.
    fn len(&self) -> usize;

    /// Whether the policy tracks no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fans callbacks out to an ordered list of sub-policies.
///
/// Weights are normalized to sum to 1 at construction. They currently only
/// shape notification propagation: victim selection and `len` delegate to
/// the first sub-policy.
pub struct CombinedPolicy<K> {
    policies: Vec<Arc<dyn EvictionPolicy<K>>>,
    weights: Vec<f64>,
}

impl<K> CombinedPolicy<K> {
    /// Combines `policies` with one weight per policy.
    ///
    /// # Panics
    ///
    /// Panics if `policies` and `weights` differ in length.
    pub fn new(policies: Vec<Arc<dyn EvictionPolicy<K>>>, weights: Vec<f64>) -> Self {
        assert_eq!(
            policies.len(),
            weights.len(),
            "policies and weights must have the same length"
        );

        let sum: f64 = weights.iter().sum();
        let weights = weights.iter().map(|w| w / sum).collect();
        Self { policies, weights }
    }

    /// The normalized weight assigned to each sub-policy.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl<K> EvictionPolicy<K> for CombinedPolicy<K>
where
    K: Send + Sync,
{
    fn on_access(&self, key: &K) {
        for policy in &self.policies {
            policy.on_access(key);
        }
    }

    fn on_add(&self, key: &K, access_count: u64, created_at: SystemTime, accessed_at: SystemTime) {
        for policy in &self.policies {
            policy.on_add(key, access_count, created_at, accessed_at);
        }
    }

    fn on_remove(&self, key: &K) {
        for policy in &self.policies {
            policy.on_remove(key);
        }
    }

    fn select_victim(&self) -> Option<K> {
        self.policies.first()?.select_victim()
    }

    fn len(&self) -> usize {
        self.policies.first().map_or(0, |policy| policy.len())
    }
}
