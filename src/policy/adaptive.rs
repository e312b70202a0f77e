//! Adaptive replacement (ARC-style) eviction.
//!
//! Balances recency against frequency by splitting residents into two
//! lists and remembering recently evicted keys in two ghost lists.
//!
//! ```text
//!   T1 (seen once)        MRU ─► [..] ◄──► [..] ◄── LRU ─evict─► B1 (ghost keys)
//!   T2 (seen again)       MRU ─► [..] ◄──► [..] ◄── LRU ─evict─► B2 (ghost keys)
//!
//!   target p = desired |T1|
//!     put(k) with k ∈ B1  →  p = min(p + delta, capacity)   (recency was undersized)
//!     put(k) with k ∈ B2  →  p = max(p - delta, 0)          (frequency was undersized)
//!
//!   replace(from_b2):
//!     |T1| > 0 and (|T1| > p or (from_b2 and |T1| == p))  →  evict LRU(T1) into B1
//!     otherwise                                           →  evict LRU(T2) into B2
//! ```
//!
//! A hit in T1 promotes the key to T2; a ghost hit re-enters directly into
//! T2. Each ghost list holds at most `capacity` keys.
//!
//! Both tunables live in [`AdaptiveConfig`].

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ds::{GhostList, IntrusiveList, SlotId};
use crate::error::ConfigError;
use crate::traits::{EvictionPolicy, MutableCache};

/// Tunables for [`AdaptiveCache`].
///
/// ```
/// use shardkit::policy::AdaptiveConfig;
///
/// assert!(AdaptiveConfig::default().validate().is_ok());
/// assert!(AdaptiveConfig::new(0, 0.5).validate().is_err());
/// assert!(AdaptiveConfig::new(1, 1.5).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdaptiveConfig {
    /// Step applied to the target on every ghost hit. Must be >= 1.
    pub delta: usize,
    /// Initial target as a fraction of capacity, in `[0, 1]`.
    pub initial_target_fraction: f64,
}

impl AdaptiveConfig {
    pub fn new(delta: usize, initial_target_fraction: f64) -> Self {
        Self {
            delta,
            initial_target_fraction,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delta == 0 {
            return Err(ConfigError::new("adaptive delta must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.initial_target_fraction) {
            return Err(ConfigError::new(format!(
                "initial_target_fraction must be within [0, 1], got {}",
                self.initial_target_fraction
            )));
        }
        Ok(())
    }

    fn initial_target(&self, capacity: usize) -> usize {
        ((capacity as f64 * self.initial_target_fraction).round() as usize).min(capacity)
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self::new(1, 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Recent,
    Frequent,
}

struct Resident<V> {
    segment: Segment,
    node: SlotId,
    value: V,
}

/// Recency/frequency self-tuning cache.
pub struct AdaptiveCache<K, V> {
    index: FxHashMap<K, Resident<V>>,
    recent: IntrusiveList<K>,
    frequent: IntrusiveList<K>,
    ghost_recent: GhostList<K>,
    ghost_frequent: GhostList<K>,
    capacity: usize,
    target: usize,
    config: AdaptiveConfig,
}

impl<K, V> AdaptiveCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Cache with the default tunables (`delta = 1`, target starts at half).
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, AdaptiveConfig::default())
    }

    pub fn try_with_config(capacity: usize, config: AdaptiveConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(capacity, config))
    }

    fn build(capacity: usize, config: AdaptiveConfig) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            recent: IntrusiveList::with_capacity(capacity),
            frequent: IntrusiveList::with_capacity(capacity),
            ghost_recent: GhostList::new(capacity),
            ghost_frequent: GhostList::new(capacity),
            capacity,
            target: config.initial_target(capacity),
            config,
        }
    }

    pub fn config(&self) -> AdaptiveConfig {
        self.config
    }

    /// Current target size of the recency list.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn frequent_len(&self) -> usize {
        self.frequent.len()
    }

    pub fn ghost_recent_len(&self) -> usize {
        self.ghost_recent.len()
    }

    pub fn ghost_frequent_len(&self) -> usize {
        self.ghost_frequent.len()
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|r| &r.value)
    }

    fn evicts_recent(&self, target: usize, from_ghost_frequent: bool) -> bool {
        let t1 = self.recent.len();
        if t1 > 0 && (t1 > target || (from_ghost_frequent && t1 == target)) {
            true
        } else {
            self.frequent.is_empty() && t1 > 0
        }
    }

    fn victim(&self, target: usize, from_ghost_frequent: bool) -> Option<&K> {
        if self.evicts_recent(target, from_ghost_frequent) {
            self.recent.back()
        } else {
            self.frequent.back()
        }
    }

    /// Key that the next eviction would remove, assuming a cold miss.
    pub fn peek_victim(&self) -> Option<&K> {
        self.victim(self.target, false)
    }

    /// Key that inserting `incoming` into a full cache would evict.
    ///
    /// Unlike [`peek_victim`](Self::peek_victim) this accounts for a ghost
    /// hit on `incoming`, which moves the target before the eviction.
    pub fn victim_for(&self, incoming: &K) -> Option<&K> {
        if self.index.contains_key(incoming) {
            return None;
        }
        if self.ghost_recent.contains(incoming) {
            let target = (self.target + self.config.delta).min(self.capacity);
            self.victim(target, false)
        } else if self.ghost_frequent.contains(incoming) {
            self.victim(self.target.saturating_sub(self.config.delta), true)
        } else {
            self.victim(self.target, false)
        }
    }

    fn replace(&mut self, from_ghost_frequent: bool) {
        if self.evicts_recent(self.target, from_ghost_frequent) {
            if let Some(key) = self.recent.pop_back() {
                self.index.remove(&key);
                self.ghost_recent.record(key);
            }
        } else if let Some(key) = self.frequent.pop_back() {
            self.index.remove(&key);
            self.ghost_frequent.record(key);
        }
    }

    fn promote(&mut self, key: &K) {
        let Some(resident) = self.index.get_mut(key) else {
            return;
        };
        match resident.segment {
            Segment::Recent => {
                if let Some(k) = self.recent.remove(resident.node) {
                    resident.node = self.frequent.push_front(k);
                    resident.segment = Segment::Frequent;
                }
            }
            Segment::Frequent => {
                self.frequent.move_to_front(resident.node);
            }
        }
    }

    fn admit(&mut self, key: K, value: V, segment: Segment) {
        let node = match segment {
            Segment::Recent => self.recent.push_front(key.clone()),
            Segment::Frequent => self.frequent.push_front(key.clone()),
        };
        self.index.insert(
            key,
            Resident {
                segment,
                node,
                value,
            },
        );
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.recent.debug_validate_invariants();
        self.frequent.debug_validate_invariants();
        self.ghost_recent.debug_validate_invariants();
        self.ghost_frequent.debug_validate_invariants();
        assert_eq!(self.recent.len() + self.frequent.len(), self.index.len());
        assert!(self.index.len() <= self.capacity);
        assert!(self.ghost_recent.len() <= self.capacity);
        assert!(self.ghost_frequent.len() <= self.capacity);
        assert!(self.target <= self.capacity);
        for (key, resident) in &self.index {
            let list = match resident.segment {
                Segment::Recent => &self.recent,
                Segment::Frequent => &self.frequent,
            };
            assert!(list.get(resident.node) == Some(key));
            assert!(!self.ghost_recent.contains(key) && !self.ghost_frequent.contains(key));
        }
    }
}

impl<K, V> EvictionPolicy<K, V> for AdaptiveCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn get(&mut self, key: &K) -> Option<&V> {
        if !self.index.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.index.get(key).map(|r| &r.value)
    }

    fn put(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(resident) = self.index.get_mut(&key) {
            let previous = std::mem::replace(&mut resident.value, value);
            self.promote(&key);
            return Some(previous);
        }

        let full = self.index.len() >= self.capacity;
        if self.ghost_recent.remove(&key) {
            self.target = (self.target + self.config.delta).min(self.capacity);
            if full {
                self.replace(false);
            }
            self.admit(key, value, Segment::Frequent);
        } else if self.ghost_frequent.remove(&key) {
            self.target = self.target.saturating_sub(self.config.delta);
            if full {
                self.replace(true);
            }
            self.admit(key, value, Segment::Frequent);
        } else {
            if full {
                self.replace(false);
            }
            self.admit(key, value, Segment::Recent);
        }
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
        self.index.clear();
        self.recent.clear();
        self.frequent.clear();
        self.ghost_recent.clear();
        self.ghost_frequent.clear();
        self.target = self.config.initial_target(self.capacity);
    }
}

impl<K, V> MutableCache<K, V> for AdaptiveCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove(&mut self, key: &K) -> Option<V> {
        let resident = self.index.remove(key)?;
        match resident.segment {
            Segment::Recent => self.recent.remove(resident.node),
            Segment::Frequent => self.frequent.remove(resident.node),
        };
        Some(resident.value)
    }
}

impl<K, V> fmt::Debug for AdaptiveCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveCache")
            .field("capacity", &self.capacity)
            .field("target", &self.target)
            .field("recent", &self.recent.len())
            .field("frequent", &self.frequent.len())
            .field("ghost_recent", &self.ghost_recent.len())
            .field("ghost_frequent", &self.ghost_frequent.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_starts_at_configured_fraction() {
        let cache: AdaptiveCache<u32, u32> = AdaptiveCache::new(10);
        assert_eq!(cache.target(), 5);
        let cache: AdaptiveCache<u32, u32> =
            AdaptiveCache::try_with_config(10, AdaptiveConfig::new(2, 0.0)).unwrap();
        assert_eq!(cache.target(), 0);
        assert!(AdaptiveCache::<u32, u32>::try_with_config(10, AdaptiveConfig::new(0, 0.5)).is_err());
    }

    #[test]
    fn victim_for_follows_ghost_adjusted_target() {
        let mut cache = AdaptiveCache::new(2);
        cache.put("a", 1);
        cache.get(&"a");
        cache.put("b", 2);
        // |T1| == target, so the cold victim comes from T2: "a" moves to B2.
        cache.put("c", 3);
        assert_eq!(cache.ghost_frequent_len(), 1);
        cache.get(&"b");

        assert_eq!(cache.peek_victim(), Some(&"b"));
        assert_eq!(cache.victim_for(&"zzz"), Some(&"b"));
        assert_eq!(cache.victim_for(&"a"), Some(&"c"));
        assert_eq!(cache.victim_for(&"b"), None);

        cache.put("a", 10);
        assert!(!cache.contains(&"c"));
        assert!(cache.contains(&"b"));
        cache.debug_validate_invariants();
    }

    #[test]
    fn second_access_promotes_to_frequent() {
        let mut cache = AdaptiveCache::new(4);
        cache.put(1, "a");
        assert_eq!(cache.recent_len(), 1);
        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.recent_len(), 0);
        assert_eq!(cache.frequent_len(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn eviction_records_ghosts() {
        let mut cache = AdaptiveCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3);
        assert!(!cache.contains(&1));
        assert_eq!(cache.ghost_recent_len(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn recent_ghost_hit_grows_target() {
        let mut cache = AdaptiveCache::new(2);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(3, 3); // 1 -> B1
        let before = cache.target();
        cache.put(1, 10);
        assert_eq!(cache.target(), before + 1);
        assert_eq!(cache.peek(&1), Some(&10));
        assert_eq!(cache.ghost_recent_len(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn frequent_ghost_hit_shrinks_target() {
        let mut cache = AdaptiveCache::try_with_config(2, AdaptiveConfig::new(1, 1.0)).unwrap();
        cache.put(1, 1);
        cache.get(&1); // 1 in T2
        cache.put(2, 2);
        cache.get(&2); // 2 in T2
        cache.put(3, 3); // T1 is empty, so T2's LRU (1) goes to B2
        assert!(!cache.contains(&1));
        assert_eq!(cache.ghost_frequent_len(), 1);

        cache.put(1, 1);
        assert_eq!(cache.target(), 1);
        cache.debug_validate_invariants();
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut cache = AdaptiveCache::new(8);
        for i in 0..1_000u32 {
            cache.put(i % 37, i);
            if i % 3 == 0 {
                cache.get(&(i % 11));
            }
            assert!(cache.len() <= 8);
        }
        cache.debug_validate_invariants();
    }

    #[test]
    fn zero_capacity_is_noop() {
        let mut cache = AdaptiveCache::new(0);
        cache.put(1, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.ghost_recent_len(), 0);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = AdaptiveCache::new(3);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.get(&2);
        assert_eq!(cache.remove(&2), Some(2));
        assert_eq!(cache.remove(&2), None);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.target(), 2);
        cache.debug_validate_invariants();
    }
}
