//! Per-shard eviction policies.
//!
//! | Policy            | Evicts                                  | Extra state          |
//! |-------------------|-----------------------------------------|----------------------|
//! | [`LfuCache`]      | lowest access count, oldest on ties     | frequency buckets    |
//! | [`LruCache`]      | least recently used                     | recency list         |
//! | [`AdaptiveCache`] | LRU of the recency or frequency segment | two ghost key lists  |

pub mod adaptive;
pub mod lfu;
pub mod lru;

pub use adaptive::{AdaptiveCache, AdaptiveConfig};
pub use lfu::LfuCache;
pub use lru::LruCache;
