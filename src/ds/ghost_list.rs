//! Bounded recency list of evicted keys.
//!
//! Remembers the identities (not the values) of recently evicted keys so the
//! adaptive policy can tell "evicted from the recency side" apart from
//! "evicted from the frequency side" when such a key comes back.
//!
//! ```text
//!   index: FxHashMap<K, SlotId>        list: IntrusiveList<K>
//!   ┌─────────┬─────────┐              head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!   │  key A  │  id_1   │                 newest                  oldest
//!   │  key B  │  id_2   │
//!   └─────────┴─────────┘
//! ```
//!
//! `record`, `remove` and `contains` are O(1) average.
use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;

/// Keys-only history with a hard capacity; the oldest key falls off first.
#[derive(Debug)]
pub struct GhostList<K> {
    list: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K> GhostList<K> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as the newest ghost, dropping the oldest one when full.
    pub fn record(&mut self, key: K) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_front(id);
            return;
        }
        if self.list.len() >= self.capacity
            && let Some(oldest) = self.list.pop_back()
        {
            self.index.remove(&oldest);
        }
        let id = self.list.push_front(key.clone());
        self.index.insert(key, id);
    }

    /// Forgets `key`; returns `true` if it was remembered.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.list.remove(id).is_some(),
            None => false,
        }
    }

    /// Drops the oldest ghost, if any.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let key = self.list.pop_back()?;
        self.index.remove(&key);
        Some(key)
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(self.list.len(), self.index.len());
        assert!(self.list.len() <= self.capacity);
        for (key, &id) in &self.index {
            assert!(self.list.get(id) == Some(key));
        }
    }
}
