//! TTL eviction policy with a background sweeper.
//!
//! Tracks a fixed expiry per key (`created_at + ttl`) and nominates expired
//! keys as victims. A background thread purges expired keys from the
//! tracking map every `ttl / 2`; the purge only bounds the policy's own
//! memory — whether a *shard* still returns an entry is decided by the
//! entry's expiry check at lookup time.

use std::hash::Hash;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::EvictionPolicy;

/// Time-to-live eviction policy.
///
/// The sweep is eventually consistent: an expired key may be purged from
/// tracking before it is ever nominated as a victim.
///
/// [`close`](TtlPolicy::close) stops the sweeper and waits for it to exit;
/// dropping the policy closes it as a fallback.
pub struct TtlPolicy<K> {
    expiries: Arc<Mutex<FxHashMap<K, SystemTime>>>,
    ttl: Duration,
    stop: Mutex<Option<Sender<()>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K> TtlPolicy<K>
where
    K: Eq + Hash + Send + 'static,
{
    /// Creates a TTL policy sweeping every `ttl / 2`.
    ///
    /// A zero `ttl` disables both expiry tracking and the sweeper.
    pub fn new(ttl: Duration) -> Self {
        let expiries: Arc<Mutex<FxHashMap<K, SystemTime>>> = Arc::default();

        let (stop, sweeper) = if ttl.is_zero() {
            (None, None)
        } else {
            let (tx, rx) = mpsc::channel();
            let map = Arc::clone(&expiries);
            let handle = thread::spawn(move || sweep_loop(map, ttl / 2, rx));
            (Some(tx), Some(handle))
        };

        Self {
            expiries,
            ttl,
            stop: Mutex::new(stop),
            sweeper: Mutex::new(sweeper),
        }
    }
}

impl<K> TtlPolicy<K> {
    /// Stops the background sweeper and waits for it to exit. Idempotent.
    pub fn close(&self) {
        self.stop.lock().take();
        if let Some(handle) = self.sweeper.lock().take() {
            let _ = handle.join();
            debug!("ttl sweeper stopped");
        }
    }
}

impl<K> Drop for TtlPolicy<K> {
    fn drop(&mut self) {
        self.close();
    }
}

fn sweep_loop<K: Eq + Hash>(
    expiries: Arc<Mutex<FxHashMap<K, SystemTime>>>,
    period: Duration,
    stop: Receiver<()>,
) {
    loop {
        match stop.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => {
                let now = SystemTime::now();
                let mut map = expiries.lock();
                let before = map.len();
                map.retain(|_, expiry| now <= *expiry);
                let swept = before - map.len();
                if swept > 0 {
                    trace!(swept, "ttl sweep purged expired keys");
                }
            }
            // Sender dropped (close) or an explicit stop signal.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

impl<K> EvictionPolicy<K> for TtlPolicy<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn on_access(&self, key: &K) {
        let mut map = self.expiries.lock();
        if let Some(expiry) = map.get(key) {
            if SystemTime::now() > *expiry {
                map.remove(key);
            }
        }
    }

    fn on_add(&self, key: &K, _access_count: u64, created_at: SystemTime, _accessed_at: SystemTime) {
        if self.ttl.is_zero() {
            return;
        }
        self.expiries.lock().insert(key.clone(), created_at + self.ttl);
    }

    fn on_remove(&self, key: &K) {
        self.expiries.lock().remove(key);
    }

    fn select_victim(&self) -> Option<K> {
        let now = SystemTime::now();
        let map = self.expiries.lock();
        map.iter()
            .find(|(_, expiry)| now > **expiry)
            .map(|(key, _)| key.clone())
    }

    fn len(&self) -> usize {
        self.expiries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_keys_are_not_victims() {
        let policy: TtlPolicy<&str> = TtlPolicy::new(Duration::from_secs(1));
        let now = SystemTime::now();
        policy.on_add(&"key1", 0, now, now);

        assert_eq!(policy.select_victim(), None);
        assert_eq!(policy.len(), 1);
        policy.close();
    }

    #[test]
    fn expired_keys_become_victims_or_are_swept() {
        let policy: TtlPolicy<&str> = TtlPolicy::new(Duration::from_millis(50));
        let now = SystemTime::now();
        policy.on_add(&"key1", 0, now, now);

        thread::sleep(Duration::from_millis(120));

        // The sweeper may have purged the key before we ask; either way it
        // must no longer be protected.
        match policy.select_victim() {
            Some(victim) => assert_eq!(victim, "key1"),
            None => assert_eq!(policy.len(), 0),
        }
        policy.close();
    }

    #[test]
    fn remove_untracks_keys() {
        let policy: TtlPolicy<&str> = TtlPolicy::new(Duration::from_secs(1));
        let now = SystemTime::now();
        policy.on_add(&"key1", 0, now, now);
        policy.on_remove(&"key1");

        assert_eq!(policy.len(), 0);
        policy.close();
    }

    #[test]
    fn access_purges_expired_keys() {
        let policy: TtlPolicy<&str> = TtlPolicy::new(Duration::from_secs(60));
        let past = SystemTime::now() - Duration::from_secs(120);
        policy.on_add(&"stale", 0, past, past);

        policy.on_access(&"stale");
        assert_eq!(policy.len(), 0);
        policy.close();
    }

    #[test]
    fn close_is_idempotent() {
        let policy: TtlPolicy<u32> = TtlPolicy::new(Duration::from_millis(10));
        policy.close();
        policy.close();
    }

    #[test]
    fn zero_ttl_tracks_nothing() {
        let policy: TtlPolicy<u32> = TtlPolicy::new(Duration::ZERO);
        let now = SystemTime::now();
        policy.on_add(&1, 0, now, now);
        assert_eq!(policy.len(), 0);
        assert_eq!(policy.select_victim(), None);
    }
}
