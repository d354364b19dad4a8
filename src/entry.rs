//! The unit of storage: a value plus its lifecycle bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::context::MetadataMap;

/// Current wall-clock time in microseconds since the Unix epoch.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

fn to_system_time(micros: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros)
}

/// A single cache record with creation/access timestamps, an access
/// counter, optional expiry, a namespace tag and a metadata snapshot.
///
/// Access tracking goes through atomics: the owning shard touches entries
/// while holding only a read lock, so `accessed_at` is last-writer-wins and
/// `access_count` never loses increments.
pub struct Entry<K, V> {
    key: K,
    value: V,
    created_at: u64,
    accessed_at: AtomicU64,
    access_count: AtomicU64,
    /// Microseconds since the epoch; 0 means the entry never expires.
    expires_at: u64,
    metadata: Arc<MetadataMap>,
    namespace: String,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(
        key: K,
        value: V,
        ttl: Duration,
        namespace: String,
        metadata: Arc<MetadataMap>,
    ) -> Self {
        let now = now_micros();
        let expires_at = if ttl.is_zero() {
            0
        } else {
            now + ttl.as_micros() as u64
        };
        Self {
            key,
            value,
            created_at: now,
            accessed_at: AtomicU64::new(now),
            access_count: AtomicU64::new(0),
            expires_at,
            metadata,
            namespace,
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn replace_value(&mut self, value: V) {
        self.value = value;
    }

    /// When the entry was created.
    pub fn created_at(&self) -> SystemTime {
        to_system_time(self.created_at)
    }

    /// When the entry was last returned by a lookup (or created).
    pub fn accessed_at(&self) -> SystemTime {
        to_system_time(self.accessed_at.load(Ordering::Relaxed))
    }

    /// How many times the entry has been returned by an exact or similar
    /// lookup.
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// When the entry expires, or `None` if it never does.
    pub fn expires_at(&self) -> Option<SystemTime> {
        (self.expires_at != 0).then(|| to_system_time(self.expires_at))
    }

    /// The namespace the entry was created under (`""` = global).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Metadata snapshotted from the ambient context at creation time.
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Whether the entry's expiry time has passed. Entries with no expiry
    /// never report expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at != 0 && now_micros() > self.expires_at
    }

    /// Records a hit: bumps the access counter and moves `accessed_at`
    /// forward. Takes `&self`; see the type-level note on atomics.
    pub(crate) fn touch(&self) {
        self.accessed_at.store(now_micros(), Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }
}
