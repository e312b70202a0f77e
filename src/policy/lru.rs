//! # LRU (Least Recently Used) Cache
//!
//! Strict recency order: every hit or write moves the key to the front, and
//! a full cache evicts from the back.
//!
//! ```text
//!   index: FxHashMap<K, Entry<V>>          order: IntrusiveList<K>
//!   ┌─────────┬──────────────────┐
//!   │  key A  │ node: id_0, val  │────►  head ─► [A] ◄──► [C] ◄──► [B] ◄── tail
//!   │  key B  │ node: id_1, val  │         MRU                        LRU
//!   │  key C  │ node: id_2, val  │
//!   └─────────┴──────────────────┘
//!
//!   put(D) when full:   pop tail (B), push D at head
//!   get(C):             move C to head
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::policy::LruCache;
//! use shardkit::traits::EvictionPolicy;
//!
//! let mut cache = LruCache::new(1);
//! cache.put(1, 1);
//! cache.put(2, 2);
//! assert_eq!(cache.get(&1), None);
//! assert_eq!(cache.get(&2), Some(&2));
//! ```

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{IntrusiveList, SlotId};
use crate::traits::{EvictionPolicy, LruPolicy, MutableCache};

struct Entry<V> {
    node: SlotId,
    value: V,
}

/// O(1) LRU cache.
pub struct LruCache<K, V> {
    order: IntrusiveList<K>,
    index: FxHashMap<K, Entry<V>>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            order: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Value lookup that leaves the recency order alone.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|entry| &entry.value)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// 0 for the most recently used key.
    pub fn recency_rank(&self, key: &K) -> Option<usize> {
        if !self.index.contains_key(key) {
            return None;
        }
        self.order.iter().position(|k| k == key)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.order.debug_validate_invariants();
        assert_eq!(self.order.len(), self.index.len());
        assert!(self.index.len() <= self.capacity);
        for (key, entry) in &self.index {
            assert!(self.order.get(entry.node) == Some(key));
        }
    }
}

impl<K, V> EvictionPolicy<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn get(&mut self, key: &K) -> Option<&V> {
        let entry = self.index.get(key)?;
        self.order.move_to_front(entry.node);
        Some(&entry.value)
    }

    fn put(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(entry) = self.index.get_mut(&key) {
            self.order.move_to_front(entry.node);
            return Some(std::mem::replace(&mut entry.value, value));
        }
        if self.index.len() >= self.capacity {
            self.pop_lru();
        }
        let node = self.order.push_front(key.clone());
        self.index.insert(key, Entry { node, value });
        None
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

impl<K, V> MutableCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.index.remove(key)?;
        self.order.remove(entry.node);
        Some(entry.value)
    }
}

impl<K, V> LruPolicy<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn pop_lru(&mut self) -> Option<(K, V)> {
        let key = self.order.pop_back()?;
        let entry = self.index.remove(&key)?;
        Some((key, entry.value))
    }

    fn peek_lru(&self) -> Option<(&K, &V)> {
        let key = self.order.back()?;
        self.index
            .get_key_value(key)
            .map(|(key, entry)| (key, &entry.value))
    }

    fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(entry) => self.order.move_to_front(entry.node),
            None => false,
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_one_keeps_latest() {
        let mut cache = LruCache::new(1);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&2));
        cache.debug_validate_invariants();
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = LruCache::new(3);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);
        cache.get(&"a");
        cache.put("d", 4);

        assert!(!cache.contains(&"b"));
        assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec!["d", "a", "c"]);
        assert_eq!(cache.recency_rank(&"c"), Some(2));
    }

    #[test]
    fn update_moves_to_front_and_returns_old() {
        let mut cache = LruCache::new(2);
        cache.put(1, "x");
        cache.put(2, "y");
        assert_eq!(cache.put(1, "z"), Some("x"));
        cache.put(3, "w");
        assert!(!cache.contains(&2));
        assert_eq!(cache.peek(&1), Some(&"z"));
    }

    #[test]
    fn peek_and_pop_lru() {
        let mut cache = LruCache::new(3);
        cache.put(1, 10);
        cache.put(2, 20);
        assert_eq!(cache.peek_lru(), Some((&1, &10)));
        assert!(cache.touch(&1));
        assert!(!cache.touch(&99));
        assert_eq!(cache.pop_lru(), Some((2, 20)));
        assert_eq!(cache.pop_lru(), Some((1, 10)));
        assert_eq!(cache.pop_lru(), None);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = LruCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        assert_eq!(cache.remove(&1), Some(1));
        assert_eq!(cache.remove(&1), None);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        cache.debug_validate_invariants();
    }

    #[test]
    fn zero_capacity_is_noop() {
        let mut cache = LruCache::new(0);
        cache.put(1, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
    }
}
