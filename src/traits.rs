//! # Trait Seams
//!
//! Eviction policies share one small interface; probabilistic collaborators
//! and key locators plug in through single-method capabilities.
//!
//! ```text
//!                 ┌──────────────────────────────────────┐
//!                 │        EvictionPolicy<K, V>          │
//!                 │                                      │
//!                 │  get(&mut, &K) → Option<&V>          │
//!                 │  put(&mut, K, V) → Option<V>         │
//!                 │  contains / len / capacity / clear   │
//!                 └──────────────────┬───────────────────┘
//!                                    │
//!                 ┌──────────────────┴───────────────────┐
//!                 │         MutableCache<K, V>           │
//!                 │  remove(&K) → Option<V>              │
//!                 └───────┬──────────────────────┬───────┘
//!                         │                      │
//!            ┌────────────┴──────────┐  ┌────────┴──────────────┐
//!            │    LfuPolicy<K, V>    │  │    LruPolicy<K, V>    │
//!            │  pop_lfu / peek_lfu   │  │  pop_lru / peek_lru   │
//!            │  frequency(&K)        │  │  touch(&K)            │
//!            └───────────────────────┘  └───────────────────────┘
//!
//!   Collaborators (implemented outside this crate):
//!     MembershipFilter::check(&[u8]) → bool      false = definitely absent
//!     FrequencyEstimator::estimate(&[u8]) → u64  approximate access count
//! ```
//!
//! Closures implement both collaborator traits, so a Bloom filter from any
//! crate can be wired in as `move |key: &[u8]| bloom.check(key)`.

use crate::error::RingError;
use crate::ring::NodeId;

/// Operations every per-shard eviction policy supports.
///
/// ```
/// use shardkit::policy::LfuCache;
/// use shardkit::traits::EvictionPolicy;
///
/// fn warm<C: EvictionPolicy<u64, String>>(cache: &mut C, data: &[(u64, &str)]) {
///     for (key, value) in data {
///         cache.put(*key, value.to_string());
///     }
/// }
///
/// let mut cache = LfuCache::new(8);
/// warm(&mut cache, &[(1, "one"), (2, "two")]);
/// assert_eq!(cache.len(), 2);
/// ```
pub trait EvictionPolicy<K, V> {
    /// Returns the value for `key`, recording the access.
    ///
    /// A miss never changes the policy's state.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// Inserting a new key into a full cache first evicts one entry chosen
    /// by the policy. A zero-capacity cache ignores every `put`.
    fn put(&mut self, key: K, value: V) -> Option<V>;

    /// Membership test that does not count as an access.
    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn clear(&mut self);
}

/// Policies that allow removing an arbitrary key.
pub trait MutableCache<K, V>: EvictionPolicy<K, V> {
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes each key in turn; results line up with `keys`.
    fn remove_batch(&mut self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|k| self.remove(k)).collect()
    }
}

/// Frequency-ordered eviction.
pub trait LfuPolicy<K, V>: MutableCache<K, V> {
    /// Removes and returns the next eviction victim.
    fn pop_lfu(&mut self) -> Option<(K, V)>;

    /// The entry [`pop_lfu`](Self::pop_lfu) would return.
    fn peek_lfu(&self) -> Option<(&K, &V)>;

    /// Access count of `key`; a freshly inserted key has frequency 1.
    fn frequency(&self, key: &K) -> Option<u64>;
}

/// Recency-ordered eviction.
pub trait LruPolicy<K, V>: MutableCache<K, V> {
    fn pop_lru(&mut self) -> Option<(K, V)>;

    fn peek_lru(&self) -> Option<(&K, &V)>;

    /// Marks `key` as most recently used without reading it.
    fn touch(&mut self, key: &K) -> bool;
}

/// Approximate membership test consulted before routing a read.
///
/// `false` must mean the key is definitely absent; `true` may be a false
/// positive.
pub trait MembershipFilter: Send + Sync {
    fn check(&self, key: &[u8]) -> bool;
}

impl<F> MembershipFilter for F
where
    F: Fn(&[u8]) -> bool + Send + Sync,
{
    fn check(&self, key: &[u8]) -> bool {
        self(key)
    }
}

/// Approximate access counter, e.g. a Count-Min sketch.
pub trait FrequencyEstimator: Send + Sync {
    fn estimate(&self, key: &[u8]) -> u64;
}

impl<F> FrequencyEstimator for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn estimate(&self, key: &[u8]) -> u64 {
        self(key)
    }
}

/// Anything that can map a key to the id of its owning node.
///
/// ```
/// use shardkit::ring::{HashRing, Node, RendezvousHash};
/// use shardkit::traits::NodeLocator;
///
/// fn owner(locator: &dyn NodeLocator, key: &str) -> String {
///     locator.owner_of(key.as_bytes()).map(|id| id.to_string()).unwrap_or_default()
/// }
///
/// let mut ring = HashRing::new(16);
/// ring.add_node(Node::new("a", 1));
/// let mut hrw = RendezvousHash::new();
/// hrw.add_node(Node::new("a", 1));
/// assert_eq!(owner(&ring, "k"), owner(&hrw, "k"));
/// ```
pub trait NodeLocator {
    fn owner_of(&self, key: &[u8]) -> Result<&NodeId, RingError>;

    fn member_count(&self) -> usize;
}

impl<D> NodeLocator for crate::ring::HashRing<D> {
    fn owner_of(&self, key: &[u8]) -> Result<&NodeId, RingError> {
        self.locate_id(key)
    }

    fn member_count(&self) -> usize {
        self.node_count()
    }
}

impl<D> NodeLocator for crate::ring::RendezvousHash<D> {
    fn owner_of(&self, key: &[u8]) -> Result<&NodeId, RingError> {
        self.locate_id(key)
    }

    fn member_count(&self) -> usize {
        self.node_count()
    }
}
