//! # LFU (Least Frequently Used) Cache
//!
//! Per-shard eviction policy that evicts the key with the fewest recorded
//! accesses, breaking ties by evicting the key that reached that frequency
//! first. Every operation is O(1).
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                           LfuCache<K, V>                                 │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │  FrequencyBuckets<K>                                               │ │
//!   │   │                                                                    │ │
//!   │   │   min_freq ─► freq=1: [d] ◄──► [b]          (head newest, tail     │ │
//!   │   │               freq=3: [a]                    oldest arrival)       │ │
//!   │   │               freq=7: [c]                                          │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │  FxHashMap<K, V>  (values live here)                               │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │                                                                          │
//!   │   capacity: usize                                                        │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Eviction Flow
//!
//! ```text
//!   capacity = 2
//!
//!   put(1, 1)      freq=1: [1]                      min_freq = 1
//!   put(2, 2)      freq=1: [2] [1]                  min_freq = 1
//!   get(1)         freq=1: [2]   freq=2: [1]        min_freq = 1
//!   put(3, 3)      full → pop tail of freq=1 → evict 2
//!                  freq=1: [3]   freq=2: [1]        min_freq = 1
//! ```
//!
//! ## Frequency Lifecycle
//!
//! - `put` of a new key: frequency 1, `min_freq` reset to 1.
//! - `get` hit or `put` on a present key: frequency + 1; if the old bucket
//!   drains and was the minimum, `min_freq` follows the key upward.
//! - `get` miss: no state change.
//! - `remove`/eviction: the bucket is dropped when it empties and
//!   `min_freq` moves to the next non-empty frequency.
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::policy::LfuCache;
//! use shardkit::traits::{EvictionPolicy, LfuPolicy};
//!
//! let mut cache = LfuCache::new(2);
//! cache.put(1, "one");
//! cache.put(2, "two");
//! cache.get(&1);
//! cache.put(3, "three");
//!
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&1), Some(&"one"));
//! assert_eq!(cache.frequency(&1), Some(3));
//! ```
//!
//! ## Thread Safety
//!
//! `LfuCache` is not synchronized; even `get` mutates bucket state. Wrap it
//! in a mutex (as [`ShardedCache`](crate::sharded::ShardedCache) does per
//! shard) to share it.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::FrequencyBuckets;
use crate::error::InvariantError;
use crate::traits::{EvictionPolicy, LfuPolicy, MutableCache};

/// O(1) LFU cache with FIFO tie-breaking within a frequency.
pub struct LfuCache<K, V> {
    freq: FrequencyBuckets<K>,
    values: FxHashMap<K, V>,
    capacity: usize,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// A capacity of 0 yields a cache that ignores every `put`.
    pub fn new(capacity: usize) -> Self {
        Self {
            freq: FrequencyBuckets::with_capacity(capacity),
            values: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Lowest access count among cached keys, `None` when empty.
    pub fn min_freq(&self) -> Option<u64> {
        self.freq.min_freq()
    }

    /// Value lookup that does not count as an access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.values.keys()
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let (key, _) = self.freq.pop_min()?;
        let value = self.values.remove(&key)?;
        Some((key, value))
    }

    /// Verifies the bookkeeping against a brute-force recomputation.
    ///
    /// O(n); intended for tests and debugging.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.values.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "len {} exceeds capacity {}",
                self.values.len(),
                self.capacity
            )));
        }
        if self.values.len() != self.freq.len() {
            return Err(InvariantError::new(format!(
                "{} values but {} tracked frequencies",
                self.values.len(),
                self.freq.len()
            )));
        }
        if self.values.keys().any(|k| !self.freq.contains(k)) {
            return Err(InvariantError::new("cached key has no frequency"));
        }
        let expected = self.freq.iter().map(|(_, f)| f).min();
        if self.freq.min_freq() != expected {
            return Err(InvariantError::new(format!(
                "min_freq is {:?}, true minimum is {:?}",
                self.freq.min_freq(),
                expected
            )));
        }
        Ok(())
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.freq.debug_validate_invariants();
        if let Err(err) = self.check_invariants() {
            panic!("LfuCache invariant violated: {err}");
        }
    }
}

impl<K, V> EvictionPolicy<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn get(&mut self, key: &K) -> Option<&V> {
        if !self.values.contains_key(key) {
            return None;
        }
        self.freq.touch(key);
        self.values.get(key)
    }

    fn put(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(slot) = self.values.get_mut(&key) {
            let previous = std::mem::replace(slot, value);
            self.freq.touch(&key);
            return Some(previous);
        }
        if self.values.len() >= self.capacity {
            self.evict();
        }
        self.freq.insert(key.clone());
        self.values.insert(key, value);
        None
    }

    fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.freq.clear();
        self.values.clear();
    }
}

impl<K, V> MutableCache<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.values.remove(key)?;
        self.freq.remove(key);
        Some(value)
    }
}

impl<K, V> LfuPolicy<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn pop_lfu(&mut self) -> Option<(K, V)> {
        self.evict()
    }

    fn peek_lfu(&self) -> Option<(&K, &V)> {
        let (key, _) = self.freq.peek_min()?;
        self.values.get_key_value(key)
    }

    fn frequency(&self, key: &K) -> Option<u64> {
        self.freq.frequency(key)
    }
}

impl<K, V> fmt::Debug for LfuCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCache")
            .field("len", &self.values.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod basic_behavior {
        use super::*;

        #[test]
        fn insert_and_get() {
            let mut cache = LfuCache::new(3);
            assert_eq!(cache.put("k1".to_string(), 100), None);
            assert_eq!(cache.put("k2".to_string(), 200), None);

            assert_eq!(cache.get(&"k1".to_string()), Some(&100));
            assert_eq!(cache.get(&"missing".to_string()), None);

            // 1 from insert, 1 from get
            assert_eq!(cache.frequency(&"k1".to_string()), Some(2));
            assert_eq!(cache.frequency(&"k2".to_string()), Some(1));
        }

        #[test]
        fn evicts_least_frequent() {
            let mut cache = LfuCache::new(2);
            cache.put(1, 1);
            cache.put(2, 2);
            cache.get(&1);
            cache.put(3, 3);

            assert_eq!(cache.get(&2), None);
            assert_eq!(cache.get(&1), Some(&1));
            assert_eq!(cache.get(&3), Some(&3));
            cache.debug_validate_invariants();
        }

        #[test]
        fn ties_evict_oldest_arrival() {
            let mut cache = LfuCache::new(3);
            cache.put("a", 1);
            cache.put("b", 2);
            cache.put("c", 3);
            cache.put("d", 4);
            assert!(!cache.contains(&"a"));

            cache.get(&"b");
            cache.get(&"c");
            // d is alone at freq 1
            cache.put("e", 5);
            assert!(!cache.contains(&"d"));

            // b, c, e all reach freq 2, in that order
            cache.get(&"e");
            cache.put("f", 6);
            assert!(!cache.contains(&"b"));
            assert!(cache.contains(&"c"));
            assert!(cache.contains(&"e"));
            assert!(cache.contains(&"f"));
            cache.debug_validate_invariants();
        }

        #[test]
        fn put_on_present_key_counts_as_access() {
            let mut cache = LfuCache::new(2);
            cache.put(1, "a");
            assert_eq!(cache.put(1, "b"), Some("a"));
            assert_eq!(cache.frequency(&1), Some(2));
            assert_eq!(cache.len(), 1);
            assert_eq!(cache.peek(&1), Some(&"b"));
        }

        #[test]
        fn miss_does_not_mutate() {
            let mut cache = LfuCache::new(2);
            cache.put(1, 1);
            cache.get(&9);
            assert_eq!(cache.frequency(&1), Some(1));
            assert_eq!(cache.min_freq(), Some(1));
        }

        #[test]
        fn zero_capacity_is_noop() {
            let mut cache = LfuCache::new(0);
            assert_eq!(cache.put(1, 1), None);
            assert!(cache.is_empty());
            assert_eq!(cache.get(&1), None);
            assert!(cache.check_invariants().is_ok());
        }
    }

    mod lfu_operations {
        use super::*;

        #[test]
        fn pop_and_peek_agree() {
            let mut cache = LfuCache::new(4);
            cache.put("x", 1);
            cache.put("y", 2);
            cache.get(&"x");

            assert_eq!(cache.peek_lfu(), Some((&"y", &2)));
            assert_eq!(cache.pop_lfu(), Some(("y", 2)));
            assert_eq!(cache.pop_lfu(), Some(("x", 1)));
            assert_eq!(cache.pop_lfu(), None);
            assert_eq!(cache.peek_lfu(), None);
        }

        #[test]
        fn remove_repairs_min_freq() {
            let mut cache = LfuCache::new(4);
            cache.put(1, ());
            cache.put(2, ());
            cache.get(&2);
            cache.get(&2);
            assert_eq!(cache.min_freq(), Some(1));

            assert_eq!(cache.remove(&1), Some(()));
            assert_eq!(cache.min_freq(), Some(3));
            assert_eq!(cache.remove(&1), None);
            cache.debug_validate_invariants();
        }

        #[test]
        fn clear_resets_everything() {
            let mut cache = LfuCache::new(3);
            cache.put(1, 1);
            cache.get(&1);
            cache.clear();
            assert!(cache.is_empty());
            assert_eq!(cache.min_freq(), None);
            assert_eq!(cache.frequency(&1), None);
            cache.put(1, 1);
            assert_eq!(cache.frequency(&1), Some(1));
        }

        #[test]
        fn remove_batch_lines_up_with_keys() {
            let mut cache = LfuCache::new(3);
            cache.put(1, "a");
            cache.put(2, "b");
            assert_eq!(cache.remove_batch(&[2, 7, 1]), vec![Some("b"), None, Some("a")]);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Get(u8),
            Put(u8, u32),
            Remove(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..16).prop_map(Op::Get),
                (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
                (0u8..16).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn invariants_hold_after_any_sequence(
                capacity in 0usize..8,
                ops in prop::collection::vec(op(), 0..200),
            ) {
                let mut cache = LfuCache::new(capacity);
                for op in ops {
                    match op {
                        Op::Get(k) => { cache.get(&k); }
                        Op::Put(k, v) => { cache.put(k, v); }
                        Op::Remove(k) => { cache.remove(&k); }
                    }
                    prop_assert!(cache.check_invariants().is_ok());
                    prop_assert!(cache.len() <= capacity);
                }
            }
        }
    }
}
