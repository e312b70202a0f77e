//! Frequency buckets for O(1) LFU bookkeeping.
//!
//! Tracks an exact access count per key and keeps keys grouped by count so
//! the eviction candidate is always reachable in O(1).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       FrequencyBuckets<K> Layout                        │
//! │                                                                         │
//! │   index: FxHashMap<K, SlotId>       entries: SlotArena<Entry<K>>        │
//! │   ┌──────────┬────────┐             ┌────────┬──────────────────────┐   │
//! │   │ "page_a" │  id_0  │────────────►│  id_0  │ freq:2, prev/next    │   │
//! │   │ "page_b" │  id_1  │────────────►│  id_1  │ freq:1, prev/next    │   │
//! │   │ "page_c" │  id_2  │────────────►│  id_2  │ freq:1, prev/next    │   │
//! │   └──────────┴────────┘             └────────┴──────────────────────┘   │
//! │                                                                         │
//! │   buckets: FxHashMap<u64, Bucket>   (frequency → doubly linked list)    │
//! │                                                                         │
//! │   min_freq = 1                                                          │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   freq=1: head ─► [id_2] ◄──► [id_1] ◄── tail   (tail = oldest arrival) │
//! │   freq=2: head ─► [id_0] ◄── tail                                       │
//! │                                                                         │
//! │   bucket links: freq=1 ──next──► freq=2 ──next──► None                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Within a bucket, keys are ordered by the time they *arrived at that
//! frequency*: `touch` pushes to the head, `pop_min` takes the tail of the
//! `min_freq` bucket. Buckets are linked to their neighbouring non-empty
//! frequencies so that `min_freq` can be repaired in O(1) when the minimum
//! bucket drains, including after an arbitrary `remove`.
//!
//! ## Operations
//!
//! | Operation   | Time | Notes                                   |
//! |-------------|------|-----------------------------------------|
//! | `insert`    | O(1) | New key starts at freq=1                |
//! | `touch`     | O(1) | Increment, move to head of next bucket  |
//! | `remove`    | O(1) | Unlink; drop bucket if it empties       |
//! | `pop_min`   | O(1) | Oldest arrival at `min_freq`            |
//! | `frequency` | O(1) |                                         |
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::ds::FrequencyBuckets;
//!
//! let mut freq = FrequencyBuckets::new();
//! freq.insert("a");
//! freq.insert("b");
//! freq.insert("c");
//! freq.touch(&"a");
//!
//! assert_eq!(freq.min_freq(), Some(1));
//! assert_eq!(freq.pop_min(), Some(("b", 1)));
//! assert_eq!(freq.pop_min(), Some(("c", 1)));
//! assert_eq!(freq.pop_min(), Some(("a", 2)));
//! assert_eq!(freq.pop_min(), None);
//! ```

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::ds::slot_arena::{SlotArena, SlotId};

/// Link pointers first: they are touched on every bucket move.
#[derive(Debug)]
struct Entry<K> {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    freq: u64,
    key: K,
}

#[derive(Debug, Default)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    prev: Option<u64>,
    next: Option<u64>,
}

/// O(1) exact-count LFU tracker with FIFO tie-breaking per frequency.
#[derive(Debug)]
pub struct FrequencyBuckets<K> {
    entries: SlotArena<Entry<K>>,
    index: FxHashMap<K, SlotId>,
    buckets: FxHashMap<u64, Bucket>,
    // 0 means "no keys"; a present key always has freq >= 1.
    min_freq: u64,
}

impl<K> FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty tracker with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotArena::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets: FxHashMap::default(),
            min_freq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Current access count for `key`.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| entry.freq)
    }

    /// Lowest frequency among tracked keys, `None` when empty.
    pub fn min_freq(&self) -> Option<u64> {
        (self.min_freq != 0).then_some(self.min_freq)
    }

    /// Next eviction candidate without removing it.
    pub fn peek_min(&self) -> Option<(&K, u64)> {
        let id = self.buckets.get(&self.min_freq)?.tail?;
        self.entries.get(id).map(|entry| (&entry.key, entry.freq))
    }

    /// Number of distinct non-empty frequency levels.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Starts tracking `key` at frequency 1; returns `false` if already tracked.
    pub fn insert(&mut self, key: K) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }

        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            freq: 1,
            key: key.clone(),
        });
        self.index.insert(key, id);

        if !self.buckets.contains_key(&1) {
            let next = self.min_freq();
            self.link_bucket(1, None, next);
        }
        self.push_front(1, id);
        self.min_freq = 1;
        true
    }

    /// Increments the frequency of `key` and returns the new value.
    ///
    /// The key becomes the newest arrival in its new bucket. At `u64::MAX`
    /// the count saturates and the key is only refreshed within its bucket.
    pub fn touch(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let freq = self.entries.get(id)?.freq;
        if freq == u64::MAX {
            self.unlink(freq, id);
            self.push_front(freq, id);
            return Some(freq);
        }

        let next_freq = freq + 1;
        let (prev_bucket, next_bucket) = self.bucket_neighbours(freq)?;
        self.unlink(freq, id);
        let drained = self.bucket_is_empty(freq);
        if drained {
            self.unlink_bucket(freq, prev_bucket, next_bucket);
        }

        if !self.buckets.contains_key(&next_freq) {
            let prev = if drained { prev_bucket } else { Some(freq) };
            self.link_bucket(next_freq, prev, next_bucket);
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.freq = next_freq;
        }
        self.push_front(next_freq, id);

        if drained && self.min_freq == freq {
            self.min_freq = next_freq;
        }
        Some(next_freq)
    }

    /// Stops tracking `key`; returns its last frequency.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let freq = self.detach_entry(id)?;
        self.entries.remove(id);
        self.index.remove(key);
        Some(freq)
    }

    /// Removes and returns the oldest key at the minimum frequency.
    pub fn pop_min(&mut self) -> Option<(K, u64)> {
        let id = self.buckets.get(&self.min_freq)?.tail?;
        self.detach_entry(id)?;
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.freq))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }

    /// Keys of one bucket from newest to oldest arrival.
    pub fn bucket_keys(&self, freq: u64) -> impl Iterator<Item = &K> {
        let mut current = self.buckets.get(&freq).and_then(|bucket| bucket.head);
        std::iter::from_fn(move || {
            let entry = self.entries.get(current?)?;
            current = entry.next;
            Some(&entry.key)
        })
    }

    /// All tracked `(key, freq)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.entries.iter().map(|(_, entry)| (&entry.key, entry.freq))
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.entries.len(), self.index.len());
        self.entries.debug_validate_invariants();

        if self.is_empty() {
            assert!(self.buckets.is_empty());
            assert_eq!(self.min_freq, 0);
            return;
        }

        let true_min = self
            .entries
            .iter()
            .map(|(_, entry)| entry.freq)
            .min()
            .expect("non-empty");
        assert_eq!(self.min_freq, true_min, "min_freq is stale");

        let mut linked = 0usize;
        for (&freq, bucket) in &self.buckets {
            assert!(bucket.head.is_some(), "empty bucket {freq} retained");
            match bucket.prev {
                Some(prev) => {
                    assert!(prev < freq);
                    assert_eq!(self.buckets[&prev].next, Some(freq));
                },
                None => assert_eq!(self.min_freq, freq),
            }
            if let Some(next) = bucket.next {
                assert!(next > freq);
                assert_eq!(self.buckets[&next].prev, Some(freq));
            }

            let mut prev = None;
            let mut current = bucket.head;
            while let Some(id) = current {
                let entry = self.entries.get(id).expect("bucket entry missing");
                assert_eq!(entry.freq, freq);
                assert_eq!(entry.prev, prev);
                assert_eq!(self.index.get(&entry.key), Some(&id));
                prev = Some(id);
                current = entry.next;
                linked += 1;
            }
            assert_eq!(bucket.tail, prev);
        }
        assert_eq!(linked, self.len(), "every key sits in exactly one bucket");
    }

    /// Unlinks `id` from its bucket, repairing bucket links and `min_freq`.
    /// The entry itself stays in the arena.
    fn detach_entry(&mut self, id: SlotId) -> Option<u64> {
        let freq = self.entries.get(id)?.freq;
        let (prev_bucket, next_bucket) = self.bucket_neighbours(freq)?;
        self.unlink(freq, id);
        if self.bucket_is_empty(freq) {
            self.unlink_bucket(freq, prev_bucket, next_bucket);
            if self.min_freq == freq {
                self.min_freq = next_bucket.unwrap_or(0);
            }
        }
        Some(freq)
    }

    fn bucket_neighbours(&self, freq: u64) -> Option<(Option<u64>, Option<u64>)> {
        self.buckets
            .get(&freq)
            .map(|bucket| (bucket.prev, bucket.next))
    }

    fn bucket_is_empty(&self, freq: u64) -> bool {
        self.buckets
            .get(&freq)
            .is_none_or(|bucket| bucket.head.is_none())
    }

    fn link_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        self.buckets.insert(
            freq,
            Bucket {
                head: None,
                tail: None,
                prev,
                next,
            },
        );
        if let Some(bucket) = prev.and_then(|p| self.buckets.get_mut(&p)) {
            bucket.next = Some(freq);
        }
        if let Some(bucket) = next.and_then(|n| self.buckets.get_mut(&n)) {
            bucket.prev = Some(freq);
        }
    }

    fn unlink_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        if let Some(bucket) = prev.and_then(|p| self.buckets.get_mut(&p)) {
            bucket.next = next;
        }
        if let Some(bucket) = next.and_then(|n| self.buckets.get_mut(&n)) {
            bucket.prev = prev;
        }
        self.buckets.remove(&freq);
    }

    fn push_front(&mut self, freq: u64, id: SlotId) {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return;
        };
        let old_head = bucket.head;
        bucket.head = Some(id);
        if old_head.is_none() {
            bucket.tail = Some(id);
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(entry) = old_head.and_then(|h| self.entries.get_mut(h)) {
            entry.prev = Some(id);
        }
    }

    fn unlink(&mut self, freq: u64, id: SlotId) {
        let Some((prev, next)) = self.entries.get(id).map(|entry| (entry.prev, entry.next)) else {
            return;
        };
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return;
        };
        if prev.is_none() {
            bucket.head = next;
        }
        if next.is_none() {
            bucket.tail = prev;
        }
        if let Some(entry) = prev.and_then(|p| self.entries.get_mut(p)) {
            entry.next = next;
        }
        if let Some(entry) = next.and_then(|n| self.entries.get_mut(n)) {
            entry.prev = prev;
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = None;
        }
    }
}

impl<K> Default for FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_starts_at_one() {
        let mut freq = FrequencyBuckets::new();
        assert!(freq.insert("a"));
        assert!(!freq.insert("a"));
        assert_eq!(freq.frequency(&"a"), Some(1));
        assert_eq!(freq.min_freq(), Some(1));
        freq.debug_validate_invariants();
    }

    #[test]
    fn touch_moves_min_when_bucket_drains() {
        let mut freq = FrequencyBuckets::new();
        freq.insert("a");
        assert_eq!(freq.touch(&"a"), Some(2));
        assert_eq!(freq.min_freq(), Some(2));
        assert_eq!(freq.touch(&"a"), Some(3));
        assert_eq!(freq.min_freq(), Some(3));
        assert_eq!(freq.bucket_count(), 1);
        freq.debug_validate_invariants();
    }

    #[test]
    fn touch_missing_is_none() {
        let mut freq: FrequencyBuckets<&str> = FrequencyBuckets::new();
        assert_eq!(freq.touch(&"ghost"), None);
        assert!(freq.is_empty());
    }

    #[test]
    fn pop_min_is_fifo_within_bucket() {
        let mut freq = FrequencyBuckets::new();
        freq.insert(1);
        freq.insert(2);
        freq.insert(3);
        freq.touch(&1);
        freq.touch(&2);
        // 1 reached freq=2 before 2 did, so it is older there.
        assert_eq!(freq.pop_min(), Some((3, 1)));
        assert_eq!(freq.pop_min(), Some((1, 2)));
        assert_eq!(freq.pop_min(), Some((2, 2)));
        assert_eq!(freq.min_freq(), None);
        freq.debug_validate_invariants();
    }

    #[test]
    fn remove_middle_bucket_relinks_neighbours() {
        let mut freq = FrequencyBuckets::new();
        freq.insert("low");
        freq.insert("mid");
        freq.insert("high");
        freq.touch(&"mid");
        for _ in 0..3 {
            freq.touch(&"high");
        }
        assert_eq!(freq.remove(&"mid"), Some(2));
        freq.debug_validate_invariants();
        assert_eq!(freq.remove(&"low"), Some(1));
        assert_eq!(freq.min_freq(), Some(4));
        freq.debug_validate_invariants();
        assert_eq!(freq.remove(&"high"), Some(4));
        assert_eq!(freq.min_freq(), None);
        freq.debug_validate_invariants();
    }

    #[test]
    fn new_key_resets_min_to_one() {
        let mut freq = FrequencyBuckets::new();
        freq.insert("a");
        freq.touch(&"a");
        freq.touch(&"a");
        assert_eq!(freq.min_freq(), Some(3));
        freq.insert("b");
        assert_eq!(freq.min_freq(), Some(1));
        assert_eq!(freq.peek_min(), Some((&"b", 1)));
        freq.debug_validate_invariants();
    }

    #[test]
    fn bucket_keys_newest_first() {
        let mut freq = FrequencyBuckets::new();
        freq.insert('x');
        freq.insert('y');
        freq.insert('z');
        let keys: Vec<char> = freq.bucket_keys(1).copied().collect();
        assert_eq!(keys, vec!['z', 'y', 'x']);
        assert_eq!(freq.bucket_keys(9).count(), 0);
    }

    #[test]
    fn clear_resets_state() {
        let mut freq = FrequencyBuckets::with_capacity(8);
        freq.insert(1u64);
        freq.touch(&1);
        freq.clear();
        assert!(freq.is_empty());
        assert_eq!(freq.min_freq(), None);
        assert_eq!(freq.peek_min(), None);
        freq.debug_validate_invariants();
    }
}
