//! LRU (least recently used) eviction policy.
//!
//! Keys live in an arena-backed doubly-linked list: a vector of nodes
//! addressed by index with a free list for reuse, plus a key → index map.
//! Links are indices, never pointers. Every callback is O(1).

use std::hash::Hash;
use std::time::SystemTime;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::EvictionPolicy;

struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

struct LruState<K> {
    map: FxHashMap<K, usize>,
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used; the eviction victim.
    tail: Option<usize>,
}

impl<K> LruState<K> {
    fn alloc(&mut self, node: Node<K>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = &mut self.nodes[p] {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = &mut self.nodes[n] {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_front(&mut self, idx: usize) {
        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }
        if let Some(old_head) = self.head {
            if let Some(node) = &mut self.nodes[old_head] {
                node.prev = Some(idx);
            }
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn release(&mut self, idx: usize) {
        self.unlink(idx);
        self.nodes[idx] = None;
        self.free.push(idx);
    }
}

/// Least-recently-used eviction policy.
///
/// Internally synchronized; one instance is shared by every shard of a
/// cache. The policy only tracks recency — the shard decides when to
/// evict.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use simcache::eviction::Lru;
/// use simcache::prelude::*;
///
/// let cache: Cache<String, String> = Cache::builder()
///     .max_size(100)
///     .eviction(Arc::new(Lru::new()))
///     .build();
/// ```
pub struct Lru<K> {
    state: Mutex<LruState<K>>,
}

impl<K> Lru<K> {
    /// Creates an empty LRU policy.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LruState {
                map: FxHashMap::default(),
                nodes: Vec::new(),
                free: Vec::new(),
                head: None,
                tail: None,
            }),
        }
    }
}

impl<K> Default for Lru<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for Lru<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    fn on_access(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(&idx) = state.map.get(key) {
            state.move_to_front(idx);
        }
    }

    fn on_add(&self, key: &K, _access_count: u64, _created_at: SystemTime, _accessed_at: SystemTime) {
        let mut state = self.state.lock();
        if let Some(&idx) = state.map.get(key) {
            state.move_to_front(idx);
            return;
        }

        let idx = state.alloc(Node {
            key: key.clone(),
            prev: None,
            next: None,
        });
        state.push_front(idx);
        state.map.insert(key.clone(), idx);
    }

    fn on_remove(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(idx) = state.map.remove(key) {
            state.release(idx);
        }
    }

    fn select_victim(&self) -> Option<K> {
        let state = self.state.lock();
        let tail = state.tail?;
        state.nodes[tail].as_ref().map(|node| node.key.clone())
    }

    fn len(&self) -> usize {
        self.state.lock().map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn add(lru: &Lru<&'static str>, key: &'static str) {
        let now = SystemTime::now();
        lru.on_add(&key, 0, now, now);
    }

    #[test]
    fn victim_is_least_recently_used() {
        let lru = Lru::new();
        add(&lru, "a");
        add(&lru, "b");
        add(&lru, "c");

        assert_eq!(lru.select_victim(), Some("a"));
        assert_eq!(lru.len(), 3);
    }

    #[test]
    fn access_refreshes_recency() {
        let lru = Lru::new();
        add(&lru, "a");
        add(&lru, "b");
        lru.on_access(&"a");

        assert_eq!(lru.select_victim(), Some("b"));
    }

    #[test]
    fn re_add_refreshes_recency() {
        let lru = Lru::new();
        add(&lru, "a");
        add(&lru, "b");
        add(&lru, "a");

        assert_eq!(lru.select_victim(), Some("b"));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn remove_unlinks_and_reuses_slots() {
        let lru = Lru::new();
        add(&lru, "a");
        add(&lru, "b");
        lru.on_remove(&"a");

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.select_victim(), Some("b"));

        // The freed slot is reused for the next insertion.
        add(&lru, "c");
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.select_victim(), Some("b"));
    }

    #[test]
    fn empty_policy_has_no_victim() {
        let lru: Lru<&str> = Lru::new();
        assert_eq!(lru.select_victim(), None);
        assert!(lru.is_empty());
    }

    #[test]
    fn remove_tail_then_head_keeps_list_consistent() {
        let lru = Lru::new();
        add(&lru, "a");
        add(&lru, "b");
        add(&lru, "c");

        lru.on_remove(&"a"); // tail
        assert_eq!(lru.select_victim(), Some("b"));
        lru.on_remove(&"c"); // head
        assert_eq!(lru.select_victim(), Some("b"));
        lru.on_remove(&"b");
        assert_eq!(lru.select_victim(), None);
        assert!(lru.is_empty());
    }
}
