//! Key placement: consistent hashing with virtual nodes, plus a rendezvous
//! alternative.

pub mod config;
pub mod hash_ring;
pub mod hasher;
pub mod node;
pub mod range;
pub mod rendezvous;
#[cfg(feature = "concurrency")]
pub mod shared;

pub use config::{DEFAULT_REPLICAS, MAX_NODE_VNODES, MAX_REPLICAS, RingConfig};
pub use hash_ring::{HashRing, VirtualNode};
pub use hasher::{KeyHasher, Xxh32Hasher};
pub use node::{MAX_WEIGHT, Node, NodeId};
pub use range::{HashRange, RING_SPACE};
pub use rendezvous::RendezvousHash;
#[cfg(feature = "concurrency")]
pub use shared::SharedRing;
