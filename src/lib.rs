//! shardkit: consistent-hash shard routing with per-shard eviction.
//!
//! - [`ring`]: weighted consistent-hash ring, rendezvous fallback, and a
//!   concurrently readable ring handle.
//! - [`rebalance`]: hash-range migration planning on membership change.
//! - [`policy`]: O(1) LFU, LRU, and an adaptive recency/frequency cache.
//! - [`sharded`]: the pieces wired into one request path.
//!
//! ```
//! use shardkit::prelude::*;
//!
//! let mut ring: HashRing = HashRing::new(64);
//! ring.add_node(Node::new("cache-a", 1));
//! ring.add_node(Node::new("cache-b", 2));
//!
//! let mut shard = LfuCache::new(2);
//! shard.put("k1", 1);
//! shard.put("k2", 2);
//! shard.get(&"k1");
//! shard.put("k3", 3);
//! assert!(!shard.contains(&"k2"));
//! assert!(ring.locate("k1").is_ok());
//! ```

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod rebalance;
pub mod ring;
#[cfg(feature = "concurrency")]
pub mod sharded;
pub mod traits;
