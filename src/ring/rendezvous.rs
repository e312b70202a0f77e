//! Highest-random-weight (rendezvous) hashing.
//!
//! Every node scores every key with `hash("{key}-{node}") * weight`; the
//! highest score owns the key. Lookups are O(nodes), but there is no ring
//! state to keep, and removing a node only moves the keys it owned.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::RingError;
use crate::ring::hasher::{KeyHasher, Xxh32Hasher};
use crate::ring::node::{Node, NodeId};

/// Rendezvous locator over weighted nodes.
///
/// ```
/// use shardkit::ring::{Node, RendezvousHash};
///
/// let mut hrw = RendezvousHash::new();
/// hrw.add_node(Node::new("192.168.1.1:3030", 1));
/// hrw.add_node(Node::new("192.168.1.2:8080", 1));
///
/// let before = hrw.locate_id("user1").unwrap().clone();
/// hrw.add_node(Node::new("192.168.1.3:9000", 1));
/// let after = hrw.locate_id("user1").unwrap();
/// // A key either stays put or moves to the newcomer.
/// assert!(*after == before || after.as_str() == "192.168.1.3:9000");
/// ```
pub struct RendezvousHash<D = ()> {
    seed: u32,
    hasher: Arc<dyn KeyHasher>,
    nodes: BTreeMap<NodeId, Arc<Node<D>>>,
}

impl<D> Clone for RendezvousHash<D> {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            hasher: Arc::clone(&self.hasher),
            nodes: self.nodes.clone(),
        }
    }
}

impl<D> std::fmt::Debug for RendezvousHash<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousHash")
            .field("seed", &self.seed)
            .field("hasher", &self.hasher)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D> Default for RendezvousHash<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> RendezvousHash<D> {
    pub fn new() -> Self {
        Self {
            seed: 0,
            hasher: Arc::new(Xxh32Hasher),
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hasher(mut self, hasher: impl KeyHasher + 'static) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    pub fn add_node(&mut self, node: Node<D>) -> Option<Arc<Node<D>>> {
        debug!(node = %node.id(), weight = node.weight(), "node added to rendezvous set");
        self.nodes.insert(node.id().clone(), Arc::new(node))
    }

    pub fn remove_node(&mut self, id: &str) -> Option<Arc<Node<D>>> {
        let removed = self.nodes.remove(id);
        if removed.is_some() {
            debug!(node = id, "node removed from rendezvous set");
        }
        removed
    }

    pub fn node(&self, id: &str) -> Option<&Arc<Node<D>>> {
        self.nodes.get(id)
    }

    /// Registered nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node<D>>> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Weighted score of `node` for `key`.
    pub fn score(&self, key: &[u8], node: &Node<D>) -> u64 {
        let id = node.id().as_bytes();
        let mut buf = Vec::with_capacity(key.len() + 1 + id.len());
        buf.extend_from_slice(key);
        buf.push(b'-');
        buf.extend_from_slice(id);
        u64::from(self.hasher.hash(&buf, self.seed)) * u64::from(node.weight())
    }

    /// Highest-scoring node for `key`; ties go to the smallest id.
    pub fn locate(&self, key: impl AsRef<[u8]>) -> Result<&Node<D>, RingError> {
        let key = key.as_ref();
        let mut best: Option<(u64, &Arc<Node<D>>)> = None;
        for node in self.nodes.values() {
            let score = self.score(key, node);
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, node));
            }
        }
        best.map(|(_, node)| node.as_ref())
            .ok_or(RingError::NoAvailableNode)
    }

    pub fn locate_id(&self, key: impl AsRef<[u8]>) -> Result<&NodeId, RingError> {
        self.locate(key).map(Node::id)
    }
}
