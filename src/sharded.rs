//! # Sharded Cache
//!
//! End-to-end request path: optional membership pre-filter, ring lookup,
//! then the owning shard's eviction policy.
//!
//! ```text
//!   get(key)
//!     │
//!     ├─ MembershipFilter::check(key) == false ──► None (definitely absent)
//!     │
//!     ├─ SharedRing::locate(key)  (lock-free snapshot)
//!     │        │
//!     │        ▼
//!     │   Node { id, weight, data: Arc<Mutex<Cache<K, V>>> }
//!     │        │
//!     └────────┴─► lock that shard only ─► Cache::get
//!
//!   add_shard / remove_shard
//!     └─► SharedRing (single writer) ─► RebalanceCoordinator ─► MigrationEvent
//! ```
//!
//! Each shard is serialized by its own mutex; no lock spans two shards. A
//! shard that leaves the ring is handed back to the caller so an external
//! worker can drain it according to the published events.
//!
//! ## Example
//!
//! ```
//! use shardkit::builder::CachePolicy;
//! use shardkit::sharded::ShardedCacheBuilder;
//!
//! let (cache, events) = ShardedCacheBuilder::new(1024)
//!     .policy(CachePolicy::Lfu)
//!     .shard("cache-a", 1)
//!     .shard("cache-b", 1)
//!     .build_with_events::<String, u64>()
//!     .unwrap();
//!
//! cache.put("user:1".to_string(), 7).unwrap();
//! assert_eq!(cache.get(&"user:1".to_string()), Some(7));
//!
//! cache.add_shard("cache-c", 1);
//! assert!(events.try_iter().count() > 0);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::debug;

use crate::builder::{Cache, CacheBuilder, CachePolicy};
use crate::error::{ConfigError, RingError};
use crate::rebalance::{MigrationEvent, RebalanceCoordinator};
use crate::ring::{HashRing, Node, NodeId, RingConfig, SharedRing};
use crate::traits::{EvictionPolicy, FrequencyEstimator, MembershipFilter, MutableCache};

/// One shard's cache, shared between the ring snapshot and callers.
pub type ShardHandle<K, V> = Arc<Mutex<Cache<K, V>>>;

/// Point-in-time request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardedCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// Reads answered by the membership filter without touching a shard.
    pub filtered: u64,
    pub inserts: u64,
    pub updates: u64,
    pub evictions: u64,
    /// Writes refused by the frequency estimator's admission check.
    pub rejected: u64,
    /// Requests that found no shard on the ring.
    pub unroutable: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    filtered: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
    unroutable: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ShardedCacheMetrics {
        ShardedCacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
        }
    }
}

/// Keys routed across weighted shards, each with its own eviction policy.
pub struct ShardedCache<K, V> {
    ring: SharedRing<ShardHandle<K, V>>,
    shards: CacheBuilder,
    policy: CachePolicy,
    membership: Mutex<()>,
    filter: Option<Box<dyn MembershipFilter>>,
    estimator: Option<Box<dyn FrequencyEstimator>>,
    counters: Counters,
}

impl<K, V> ShardedCache<K, V>
where
    K: AsRef<[u8]> + Eq + Hash + Clone,
{
    /// Empty cache: no shards yet, default ring shape, events only logged.
    pub fn new(shard_capacity: usize, policy: CachePolicy) -> Self {
        Self::assemble(
            HashRing::default(),
            RebalanceCoordinator::detached(),
            CacheBuilder::new(shard_capacity),
            policy,
        )
    }

    fn assemble(
        ring: HashRing<ShardHandle<K, V>>,
        coordinator: RebalanceCoordinator,
        shards: CacheBuilder,
        policy: CachePolicy,
    ) -> Self {
        Self {
            ring: SharedRing::with_coordinator(ring, coordinator),
            shards,
            policy,
            membership: Mutex::new(()),
            filter: None,
            estimator: None,
            counters: Counters::default(),
        }
    }

    /// Consults `filter` before every read; `false` short-circuits to a miss.
    pub fn with_membership_filter(mut self, filter: impl MembershipFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Admits a new key into a full shard only if `estimator` rates it at
    /// least as popular as the key its insertion would evict.
    pub fn with_frequency_estimator(mut self, estimator: impl FrequencyEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn shard_capacity(&self) -> usize {
        self.shards.capacity()
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Adds a shard, or changes the weight of an existing one.
    ///
    /// The weight is clamped into `1..=MAX_WEIGHT`. A re-registered shard
    /// keeps its cached entries. Returns `true` when the id was not on the
    /// ring before.
    pub fn add_shard(&self, id: impl Into<NodeId>, weight: u32) -> bool {
        self.register(id.into(), |id, handle| Ok(Node::with_data(id, weight, handle)))
            .unwrap_or(false)
    }

    /// Like [`add_shard`](Self::add_shard), but rejects an empty id or a
    /// weight outside `1..=MAX_WEIGHT`.
    pub fn try_add_shard(&self, id: impl Into<NodeId>, weight: u32) -> Result<bool, ConfigError> {
        self.register(id.into(), |id, handle| Node::try_with_data(id, weight, handle))
    }

    fn register(
        &self,
        id: NodeId,
        make: impl FnOnce(NodeId, ShardHandle<K, V>) -> Result<Node<ShardHandle<K, V>>, ConfigError>,
    ) -> Result<bool, ConfigError> {
        let _guard = self.membership.lock();
        let handle = match self.ring.snapshot().node(&id) {
            Some(existing) => Arc::clone(existing.data()),
            None => Arc::new(Mutex::new(self.shards.build(self.policy))),
        };
        let node = make(id.clone(), handle)?;
        let weight = node.weight();
        let fresh = self.ring.add_node(node).is_none();
        debug!(shard = %id, weight, fresh, "shard registered");
        Ok(fresh)
    }

    /// Takes a shard off the ring and hands its cache back for draining.
    pub fn remove_shard(&self, id: &str) -> Option<ShardHandle<K, V>> {
        let _guard = self.membership.lock();
        let node = self.ring.remove_node(id)?;
        debug!(shard = id, "shard unregistered");
        Some(Arc::clone(node.data()))
    }

    pub fn shard(&self, id: &str) -> Option<ShardHandle<K, V>> {
        self.ring.snapshot().node(id).map(|node| Arc::clone(node.data()))
    }

    /// Shard ids, sorted.
    pub fn shard_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.ring.snapshot().nodes().map(|n| n.id().clone()).collect();
        ids.sort();
        ids
    }

    pub fn shard_count(&self) -> usize {
        self.ring.node_count()
    }

    pub fn ring(&self) -> Arc<HashRing<ShardHandle<K, V>>> {
        self.ring.snapshot()
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Id of the shard owning `key`.
    pub fn locate(&self, key: &K) -> Result<NodeId, RingError> {
        self.ring.locate_id(key)
    }

    fn route(&self, key: &K) -> Result<ShardHandle<K, V>, RingError> {
        match self.ring.locate(key) {
            Ok(node) => Ok(Arc::clone(node.data())),
            Err(err) => {
                Counters::bump(&self.counters.unroutable);
                Err(err)
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        if let Some(filter) = &self.filter
            && !filter.check(key.as_ref())
        {
            Counters::bump(&self.counters.filtered);
            return None;
        }
        let Ok(shard) = self.route(key) else {
            Counters::bump(&self.counters.misses);
            return None;
        };
        let value = shard.lock().get(key).cloned();
        match value {
            Some(_) => Counters::bump(&self.counters.hits),
            None => Counters::bump(&self.counters.misses),
        }
        value
    }

    /// Writes `value` to the owning shard.
    ///
    /// Fails only when the ring has no shards.
    pub fn put(&self, key: K, value: V) -> Result<(), RingError> {
        let shard = self.route(&key)?;
        let mut cache = shard.lock();

        if cache.contains(&key) {
            cache.put(key, value);
            Counters::bump(&self.counters.updates);
            return Ok(());
        }
        if cache.capacity() == 0 {
            return Ok(());
        }

        let full = cache.is_full();
        if full
            && let Some(estimator) = &self.estimator
            && let Some(victim) = cache.victim_for(&key)
            && estimator.estimate(key.as_ref()) < estimator.estimate(victim.as_ref())
        {
            Counters::bump(&self.counters.rejected);
            return Ok(());
        }

        cache.put(key, value);
        Counters::bump(&self.counters.inserts);
        if full {
            Counters::bump(&self.counters.evictions);
        }
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let shard = self.route(key).ok()?;
        let mut cache = shard.lock();
        cache.remove(key)
    }

    /// Entries across all shards; each shard is locked in turn.
    pub fn len(&self) -> usize {
        self.ring.snapshot().nodes().map(|n| n.data().lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        for node in self.ring.snapshot().nodes() {
            node.data().lock().clear();
        }
    }

    pub fn metrics(&self) -> ShardedCacheMetrics {
        self.counters.snapshot()
    }
}

impl<K, V> fmt::Debug for ShardedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("policy", &self.policy)
            .field("shard_capacity", &self.shards.capacity())
            .field("ring", &self.ring)
            .field("filter", &self.filter.is_some())
            .field("estimator", &self.estimator.is_some())
            .finish()
    }
}

/// Configures and builds a [`ShardedCache`].
#[derive(Debug, Clone)]
pub struct ShardedCacheBuilder {
    shard_capacity: usize,
    policy: CachePolicy,
    ring: RingConfig,
    shards: Vec<(NodeId, u32)>,
}

impl ShardedCacheBuilder {
    pub fn new(shard_capacity: usize) -> Self {
        Self {
            shard_capacity,
            policy: CachePolicy::default(),
            ring: RingConfig::default(),
            shards: Vec::new(),
        }
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ring_config(mut self, ring: RingConfig) -> Self {
        self.ring = ring;
        self
    }

    /// Registers an initial shard. Initial shards publish no events.
    pub fn shard(mut self, id: impl Into<NodeId>, weight: u32) -> Self {
        self.shards.push((id.into(), weight));
        self
    }

    pub fn build<K, V>(self) -> Result<ShardedCache<K, V>, ConfigError>
    where
        K: AsRef<[u8]> + Eq + Hash + Clone,
    {
        self.build_with(RebalanceCoordinator::detached())
    }

    /// Builds the cache plus the stream of rebalance events for later
    /// membership changes.
    pub fn build_with_events<K, V>(
        self,
    ) -> Result<(ShardedCache<K, V>, Receiver<MigrationEvent>), ConfigError>
    where
        K: AsRef<[u8]> + Eq + Hash + Clone,
    {
        let (coordinator, events) = RebalanceCoordinator::channel();
        Ok((self.build_with(coordinator)?, events))
    }

    fn build_with<K, V>(self, coordinator: RebalanceCoordinator) -> Result<ShardedCache<K, V>, ConfigError>
    where
        K: AsRef<[u8]> + Eq + Hash + Clone,
    {
        if let CachePolicy::Adaptive(config) = &self.policy {
            config.validate()?;
        }
        let shards = CacheBuilder::new(self.shard_capacity);

        let mut ring = HashRing::try_new(self.ring)?;
        for (id, weight) in self.shards {
            let node = Node::try_with_data(id, weight, Arc::new(Mutex::new(shards.build(self.policy))))?;
            ring.add_node(node);
        }
        Ok(ShardedCache::assemble(ring, coordinator, shards, self.policy))
    }
}
