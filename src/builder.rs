//! Policy-erased cache construction.
//!
//! Shards of a [`ShardedCache`](crate::sharded::ShardedCache) all run the
//! same policy, chosen at runtime from a [`CachePolicy`] value.
//!
//! ## Example
//!
//! ```rust
//! use shardkit::builder::{CacheBuilder, CachePolicy};
//! use shardkit::traits::EvictionPolicy;
//!
//! let mut cache = CacheBuilder::new(100).build::<u64, String>(CachePolicy::Lfu);
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some(&"hello".to_string()));
//! ```

use std::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{AdaptiveCache, AdaptiveConfig, LfuCache, LruCache};
use crate::traits::{EvictionPolicy, LfuPolicy, LruPolicy, MutableCache};

/// Available eviction policies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CachePolicy {
    /// Least frequently used, exact counts.
    #[default]
    Lfu,
    /// Least recently used.
    Lru,
    /// Recency/frequency self-tuning.
    Adaptive(AdaptiveConfig),
}

impl CachePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            CachePolicy::Lfu => "lfu",
            CachePolicy::Lru => "lru",
            CachePolicy::Adaptive(_) => "adaptive",
        }
    }
}

/// Cache wrapper exposing one API regardless of policy.
pub struct Cache<K, V> {
    inner: CacheInner<K, V>,
}

enum CacheInner<K, V> {
    Lfu(LfuCache<K, V>),
    Lru(LruCache<K, V>),
    Adaptive(AdaptiveCache<K, V>),
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn policy_name(&self) -> &'static str {
        match &self.inner {
            CacheInner::Lfu(_) => "lfu",
            CacheInner::Lru(_) => "lru",
            CacheInner::Adaptive(_) => "adaptive",
        }
    }

    /// Key the next eviction would remove, if the cache were full.
    pub fn peek_victim(&self) -> Option<&K> {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.peek_lfu().map(|(k, _)| k),
            CacheInner::Lru(lru) => lru.peek_lru().map(|(k, _)| k),
            CacheInner::Adaptive(adaptive) => adaptive.peek_victim(),
        }
    }

    /// Key that inserting `incoming` would evict if the cache were full.
    ///
    /// Same as [`peek_victim`](Self::peek_victim) except for the adaptive
    /// policy, where a ghost hit on `incoming` shifts the eviction target.
    pub fn victim_for(&self, incoming: &K) -> Option<&K> {
        match &self.inner {
            CacheInner::Adaptive(adaptive) => adaptive.victim_for(incoming),
            _ => self.peek_victim(),
        }
    }

    /// Value lookup that does not count as an access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.peek(key),
            CacheInner::Lru(lru) => lru.peek(key),
            CacheInner::Adaptive(adaptive) => adaptive.peek(key),
        }
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

impl<K, V> EvictionPolicy<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn get(&mut self, key: &K) -> Option<&V> {
        match &mut self.inner {
            CacheInner::Lfu(lfu) => lfu.get(key),
            CacheInner::Lru(lru) => lru.get(key),
            CacheInner::Adaptive(adaptive) => adaptive.get(key),
        }
    }

    fn put(&mut self, key: K, value: V) -> Option<V> {
        match &mut self.inner {
            CacheInner::Lfu(lfu) => lfu.put(key, value),
            CacheInner::Lru(lru) => lru.put(key, value),
            CacheInner::Adaptive(adaptive) => adaptive.put(key, value),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.contains(key),
            CacheInner::Lru(lru) => lru.contains(key),
            CacheInner::Adaptive(adaptive) => adaptive.contains(key),
        }
    }

    fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.len(),
            CacheInner::Lru(lru) => lru.len(),
            CacheInner::Adaptive(adaptive) => adaptive.len(),
        }
    }

    fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.capacity(),
            CacheInner::Lru(lru) => lru.capacity(),
            CacheInner::Adaptive(adaptive) => adaptive.capacity(),
        }
    }

    fn clear(&mut self) {
        match &mut self.inner {
            CacheInner::Lfu(lfu) => lfu.clear(),
            CacheInner::Lru(lru) => lru.clear(),
            CacheInner::Adaptive(adaptive) => adaptive.clear(),
        }
    }
}

impl<K, V> MutableCache<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove(&mut self, key: &K) -> Option<V> {
        match &mut self.inner {
            CacheInner::Lfu(lfu) => lfu.remove(key),
            CacheInner::Lru(lru) => lru.remove(key),
            CacheInner::Adaptive(adaptive) => adaptive.remove(key),
        }
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            CacheInner::Lfu(lfu) => std::fmt::Debug::fmt(lfu, f),
            CacheInner::Lru(lru) => std::fmt::Debug::fmt(lru, f),
            CacheInner::Adaptive(adaptive) => std::fmt::Debug::fmt(adaptive, f),
        }
    }
}

/// Builder for [`Cache`] instances.
#[derive(Debug, Clone, Copy)]
pub struct CacheBuilder {
    capacity: usize,
}

impl CacheBuilder {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builds a cache, clamping out-of-range adaptive tunables.
    ///
    /// ```rust
    /// use shardkit::builder::{CacheBuilder, CachePolicy};
    /// use shardkit::policy::AdaptiveConfig;
    ///
    /// let lru = CacheBuilder::new(100).build::<u64, String>(CachePolicy::Lru);
    /// let arc = CacheBuilder::new(100)
    ///     .build::<u64, String>(CachePolicy::Adaptive(AdaptiveConfig::new(0, 2.0)));
    /// assert_eq!(lru.policy_name(), "lru");
    /// assert_eq!(arc.policy_name(), "adaptive");
    /// ```
    pub fn build<K, V>(self, policy: CachePolicy) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        let policy = match policy {
            CachePolicy::Adaptive(config) => CachePolicy::Adaptive(clamp_adaptive(config)),
            other => other,
        };
        self.assemble(policy)
    }

    /// Builds a cache, rejecting out-of-range adaptive tunables.
    pub fn try_build<K, V>(self, policy: CachePolicy) -> Result<Cache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        if let CachePolicy::Adaptive(config) = &policy {
            config.validate()?;
        }
        Ok(self.assemble(policy))
    }

    fn assemble<K, V>(self, policy: CachePolicy) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        let inner = match policy {
            CachePolicy::Lfu => CacheInner::Lfu(LfuCache::new(self.capacity)),
            CachePolicy::Lru => CacheInner::Lru(LruCache::new(self.capacity)),
            CachePolicy::Adaptive(config) => match AdaptiveCache::try_with_config(self.capacity, config) {
                Ok(adaptive) => CacheInner::Adaptive(adaptive),
                Err(_) => CacheInner::Adaptive(AdaptiveCache::new(self.capacity)),
            },
        };
        Cache { inner }
    }
}

fn clamp_adaptive(config: AdaptiveConfig) -> AdaptiveConfig {
    let fraction = if config.initial_target_fraction.is_nan() {
        AdaptiveConfig::default().initial_target_fraction
    } else {
        config.initial_target_fraction.clamp(0.0, 1.0)
    };
    AdaptiveConfig::new(config.delta.max(1), fraction)
}
