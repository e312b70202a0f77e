//! # Consistent-Hash Ring with Virtual Nodes
//!
//! Distributes keys across a changing set of nodes so that a membership
//! change only moves the keys adjacent to the affected virtual nodes.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           HashRing<D>                                │
//!   │                                                                      │
//!   │   ring: BTreeMap<u32, VirtualNode>          (ascending, wrapping)    │
//!   │                                                                      │
//!   │        0 ───── 0x1f3a ──── 0x51c0 ──── 0x9e07 ──── 0xd4a2 ───── 2³²  │
//!   │                  │           │           │           │               │
//!   │                 "a"         "b"         "a"         "c"              │
//!   │                                                                      │
//!   │   nodes: FxHashMap<NodeId, NodeEntry<D>>                             │
//!   │          NodeEntry { node: Arc<Node<D>>, vnode_hashes: [u32] }       │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lookup (successor rule)
//!
//! ```text
//!   locate(key):
//!     h = hash(key, seed)
//!     v = first vnode with v.hash >= h, else the smallest vnode (wrap)
//!     return v.node
//!
//!   Range owned by vnode v:  (predecessor(v).hash, v.hash]
//! ```
//!
//! Virtual node `i` of node `id` sits at `hash("{id}#{i}", seed)` for
//! `i in 0..replicas * weight`. The positions are computed once at
//! registration and kept with the node entry, so removal never rehashes.
//!
//! ## Example
//!
//! ```
//! use shardkit::ring::{HashRing, Node};
//!
//! let mut ring = HashRing::new(64);
//! ring.add_node(Node::new("10.0.0.1:6379", 1));
//! ring.add_node(Node::new("10.0.0.2:6379", 2));
//!
//! let owner = ring.locate("user:42").unwrap();
//! assert!(ring.contains_node(owner.id()));
//! assert_eq!(ring.vnode_count(), 64 * 3);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{ConfigError, RingError};
use crate::ring::config::{MAX_NODE_VNODES, MAX_REPLICAS, RingConfig};
use crate::ring::hasher::{KeyHasher, Xxh32Hasher};
use crate::ring::node::{Node, NodeId};
use crate::ring::range::{HashRange, RING_SPACE};

/// One position on the ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNode {
    hash: u32,
    node: NodeId,
}

impl VirtualNode {
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Id of the physical node this position belongs to.
    pub fn node_id(&self) -> &NodeId {
        &self.node
    }
}

struct NodeEntry<D> {
    node: Arc<Node<D>>,
    /// Sorted, deduplicated positions computed at registration.
    vnode_hashes: Box<[u32]>,
}

impl<D> Clone for NodeEntry<D> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            vnode_hashes: self.vnode_hashes.clone(),
        }
    }
}

/// Consistent-hash ring mapping keys to weighted nodes.
///
/// Cloning is cheap relative to rebuilding: node payloads are shared via
/// `Arc`, only the position tables are copied.
pub struct HashRing<D = ()> {
    config: RingConfig,
    hasher: Arc<dyn KeyHasher>,
    ring: BTreeMap<u32, VirtualNode>,
    nodes: FxHashMap<NodeId, NodeEntry<D>>,
}

impl<D> Clone for HashRing<D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            hasher: Arc::clone(&self.hasher),
            ring: self.ring.clone(),
            nodes: self.nodes.clone(),
        }
    }
}

impl<D> fmt::Debug for HashRing<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .field("nodes", &self.nodes.len())
            .field("vnodes", &self.ring.len())
            .finish()
    }
}

impl<D> Default for HashRing<D> {
    fn default() -> Self {
        Self::from_parts(RingConfig::default(), Arc::new(Xxh32Hasher))
    }
}

impl<D> HashRing<D> {
    /// Creates an empty ring with the default hasher and seed 0.
    ///
    /// `replicas` is clamped into `1..=MAX_REPLICAS`; use
    /// [`try_new`](Self::try_new) to reject bad values instead.
    pub fn new(replicas: u32) -> Self {
        let config = RingConfig::default().with_replicas(replicas.clamp(1, MAX_REPLICAS));
        Self::from_parts(config, Arc::new(Xxh32Hasher))
    }

    pub fn try_new(config: RingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, Arc::new(Xxh32Hasher)))
    }

    /// Replaces the hash function. Registered nodes are re-placed.
    pub fn with_hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        let registered: Vec<Arc<Node<D>>> = self
            .nodes
            .drain()
            .map(|(_, entry)| entry.node)
            .collect();
        self.ring.clear();
        for node in registered {
            self.insert_node(node);
        }
        self
    }

    fn from_parts(config: RingConfig, hasher: Arc<dyn KeyHasher>) -> Self {
        Self {
            config,
            hasher,
            ring: BTreeMap::new(),
            nodes: FxHashMap::default(),
        }
    }

    pub fn config(&self) -> RingConfig {
        self.config
    }

    pub fn replicas(&self) -> u32 {
        self.config.replicas
    }

    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    /// Ring position of `key` under this ring's hasher and seed.
    #[inline]
    pub fn hash_key(&self, key: &[u8]) -> u32 {
        self.hasher.hash(key, self.config.seed)
    }

    fn vnode_hashes_for(&self, id: &NodeId, weight: u32) -> Box<[u32]> {
        let requested = (self.config.replicas as usize).saturating_mul(weight as usize);
        let count = requested.min(MAX_NODE_VNODES);
        if count < requested {
            warn!(node = %id, requested, placed = count, "virtual node count capped");
        }
        let mut hashes: Vec<u32> = (0..count)
            .map(|i| self.hash_key(format!("{id}#{i}").as_bytes()))
            .collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes.into_boxed_slice()
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Registers `node`, placing `replicas * weight` virtual nodes.
    ///
    /// Re-adding an id already on the ring replaces the old registration
    /// (this is how a weight change is expressed) and returns it.
    pub fn add_node(&mut self, node: Node<D>) -> Option<Arc<Node<D>>> {
        self.insert_node(Arc::new(node))
    }

    fn insert_node(&mut self, node: Arc<Node<D>>) -> Option<Arc<Node<D>>> {
        let previous = self.remove_node(node.id());
        let id = node.id().clone();
        let hashes = self.vnode_hashes_for(&id, node.weight());

        for &hash in hashes.iter() {
            let vnode = VirtualNode {
                hash,
                node: id.clone(),
            };
            if let Some(displaced) = self.ring.insert(hash, vnode)
                && displaced.node != id
            {
                warn!(
                    hash,
                    previous = %displaced.node,
                    node = %id,
                    "virtual node collision, previous owner overwritten"
                );
            }
        }

        debug!(
            node = %id,
            weight = node.weight(),
            vnodes = hashes.len(),
            "node added to ring"
        );
        self.nodes.insert(
            id,
            NodeEntry {
                node,
                vnode_hashes: hashes,
            },
        );
        previous
    }

    /// Unregisters `id` and removes every virtual node it still owns.
    ///
    /// Unknown ids are a no-op.
    pub fn remove_node(&mut self, id: &str) -> Option<Arc<Node<D>>> {
        let (id, entry) = self.nodes.remove_entry(id)?;
        let mut removed = 0usize;
        let mut reclaimed = 0usize;
        for &hash in entry.vnode_hashes.iter() {
            // Positions lost to a later collision belong to someone else now.
            if !self.ring.get(&hash).is_some_and(|v| v.node == id) {
                continue;
            }
            self.ring.remove(&hash);
            removed += 1;
            if let Some(claimant) = self.claimant_of(hash) {
                self.ring.insert(hash, VirtualNode { hash, node: claimant });
                reclaimed += 1;
            }
        }
        debug!(node = %id, vnodes = removed, reclaimed, "node removed from ring");
        Some(entry.node)
    }

    /// Registered node whose precomputed positions include `hash`; the
    /// smallest id wins when several collided there.
    fn claimant_of(&self, hash: u32) -> Option<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, entry)| entry.vnode_hashes.binary_search(&hash).is_ok())
            .map(|(id, _)| id)
            .min()
            .cloned()
    }

    /// Registers every node of `other` here, replacing same-id registrations.
    ///
    /// Returns the number of nodes taken from `other`. Both rings must share
    /// replicas and seed, otherwise the same node would land on different
    /// positions.
    pub fn merge(&mut self, other: &HashRing<D>) -> Result<usize, RingError> {
        if self.config != other.config {
            return Err(RingError::ConfigMismatch {
                expected: (self.config.replicas, self.config.seed),
                found: (other.config.replicas, other.config.seed),
            });
        }
        let mut incoming: Vec<&Arc<Node<D>>> = other.nodes.values().map(|e| &e.node).collect();
        incoming.sort_by(|a, b| a.id().cmp(b.id()));
        let merged = incoming.len();
        for node in incoming {
            self.insert_node(Arc::clone(node));
        }
        Ok(merged)
    }

    pub fn clear(&mut self) {
        self.ring.clear();
        self.nodes.clear();
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Returns the node owning `key`.
    pub fn locate(&self, key: impl AsRef<[u8]>) -> Result<&Node<D>, RingError> {
        let id = self.locate_id(key)?;
        self.node(id)
            .map(|node| node.as_ref())
            .ok_or(RingError::NoAvailableNode)
    }

    /// Returns the id of the node owning `key`.
    pub fn locate_id(&self, key: impl AsRef<[u8]>) -> Result<&NodeId, RingError> {
        let hash = self.hash_key(key.as_ref());
        self.successor(hash)
            .map(|v| &v.node)
            .ok_or(RingError::NoAvailableNode)
    }

    /// First virtual node with `hash >= h`, wrapping to the smallest.
    pub fn successor(&self, hash: u32) -> Option<&VirtualNode> {
        self.ring
            .range(hash..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, v)| v)
    }

    /// Greatest virtual node with `hash < h`, wrapping to the largest.
    pub fn predecessor(&self, hash: u32) -> Option<&VirtualNode> {
        self.ring
            .range(..hash)
            .next_back()
            .or_else(|| self.ring.iter().next_back())
            .map(|(_, v)| v)
    }

    /// Range of hashes owned by the virtual node at `hash`.
    ///
    /// `None` if no virtual node sits exactly at `hash`.
    pub fn range_of(&self, hash: u32) -> Option<HashRange> {
        self.ring.get(&hash)?;
        let prev = self.predecessor(hash)?;
        Some(HashRange::new(prev.hash, hash))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn node(&self, id: &str) -> Option<&Arc<Node<D>>> {
        self.nodes.get(id).map(|e| &e.node)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Registered nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node<D>>> {
        self.nodes.values().map(|e| &e.node)
    }

    /// Every virtual node in ascending hash order.
    pub fn vnodes(&self) -> impl Iterator<Item = &VirtualNode> {
        self.ring.values()
    }

    /// Virtual nodes currently owned by `id`, ascending.
    pub fn vnodes_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a VirtualNode> + 'a {
        let entry = self.nodes.get_key_value(id);
        entry
            .into_iter()
            .flat_map(move |(id, entry)| {
                entry
                    .vnode_hashes
                    .iter()
                    .filter_map(move |h| self.ring.get(h).filter(|v| v.node == *id))
            })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn vnode_count(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Hash ranges owned by `id`, one per virtual node, ascending by end.
    pub fn owned_ranges(&self, id: &str) -> Vec<HashRange> {
        self.vnodes_of(id)
            .filter_map(|v| self.range_of(v.hash))
            .collect()
    }

    /// Fraction of the hash space owned by each node, sorted by id.
    ///
    /// Fractions sum to 1.0 for a non-empty ring.
    pub fn ownership_share(&self) -> Vec<(NodeId, f64)> {
        let Some((&last, _)) = self.ring.iter().next_back() else {
            return Vec::new();
        };
        let mut owned: FxHashMap<&NodeId, u64> = FxHashMap::default();
        let mut prev = last;
        for (&hash, vnode) in &self.ring {
            *owned.entry(&vnode.node).or_default() += HashRange::new(prev, hash).len();
            prev = hash;
        }
        let mut shares: Vec<(NodeId, f64)> = owned
            .into_iter()
            .map(|(id, span)| (id.clone(), span as f64 / RING_SPACE as f64))
            .collect();
        shares.sort_by(|a, b| a.0.cmp(&b.0));
        shares
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        for (hash, vnode) in &self.ring {
            assert_eq!(*hash, vnode.hash, "ring key disagrees with vnode hash");
            let entry = self
                .nodes
                .get(&vnode.node)
                .unwrap_or_else(|| panic!("vnode {hash} points at unregistered node"));
            assert!(
                entry.vnode_hashes.binary_search(hash).is_ok(),
                "vnode {hash} not among its node's positions"
            );
        }
        for (id, entry) in &self.nodes {
            assert_eq!(id, entry.node.id());
            assert!(entry.vnode_hashes.windows(2).all(|w| w[0] < w[1]));
            for hash in entry.vnode_hashes.iter() {
                assert!(self.ring.contains_key(hash), "position {hash} of {id} left vacant");
            }
        }
    }
}
