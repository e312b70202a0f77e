pub use crate::builder::{Cache, CacheBuilder, CachePolicy};
pub use crate::error::{ConfigError, InvariantError, RingError};
pub use crate::policy::{AdaptiveCache, AdaptiveConfig, LfuCache, LruCache};
pub use crate::rebalance::{MigrationEvent, MigrationKind, RebalanceCoordinator};
pub use crate::ring::{HashRange, HashRing, Node, NodeId, RendezvousHash, RingConfig};
#[cfg(feature = "concurrency")]
pub use crate::ring::SharedRing;
#[cfg(feature = "concurrency")]
pub use crate::sharded::{ShardedCache, ShardedCacheBuilder, ShardedCacheMetrics};
pub use crate::traits::{
    EvictionPolicy, FrequencyEstimator, LfuPolicy, LruPolicy, MembershipFilter, MutableCache,
    NodeLocator,
};
