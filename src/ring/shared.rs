//! Concurrent ring handle: lock-free reads, serialized writes.
//!
//! ```text
//!   readers ──load()──► Arc<HashRing>   (immutable snapshot, never blocks)
//!
//!   writer:  lock ─► clone current ─► mutate clone ─► store() ─► publish events
//! ```
//!
//! A reader that loaded a snapshot before a write keeps seeing the old ring
//! until it loads again; it never observes a half-applied mutation.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::error::RingError;
use crate::rebalance::RebalanceCoordinator;
use crate::ring::hash_ring::HashRing;
use crate::ring::node::{Node, NodeId};

/// Shared, concurrently readable [`HashRing`].
///
/// ```
/// use shardkit::rebalance::RebalanceCoordinator;
/// use shardkit::ring::{HashRing, Node, SharedRing};
///
/// let (coordinator, events) = RebalanceCoordinator::channel();
/// let ring = SharedRing::with_coordinator(HashRing::new(16), coordinator);
///
/// ring.add_node(Node::new("a", 1));
/// ring.add_node(Node::new("b", 1));
/// assert!(ring.locate("user:7").is_ok());
/// assert_eq!(events.try_iter().count(), 16);
/// ```
pub struct SharedRing<D = ()> {
    current: ArcSwap<HashRing<D>>,
    writer: Mutex<()>,
    coordinator: RebalanceCoordinator,
}

impl<D> std::fmt::Debug for SharedRing<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRing")
            .field("ring", &*self.current.load())
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

impl<D> SharedRing<D> {
    /// Wraps `ring`; membership changes are planned but only logged.
    pub fn new(ring: HashRing<D>) -> Self {
        Self::with_coordinator(ring, RebalanceCoordinator::detached())
    }

    pub fn with_coordinator(ring: HashRing<D>, coordinator: RebalanceCoordinator) -> Self {
        Self {
            current: ArcSwap::from_pointee(ring),
            writer: Mutex::new(()),
            coordinator,
        }
    }

    /// Current ring snapshot.
    pub fn snapshot(&self) -> Arc<HashRing<D>> {
        self.current.load_full()
    }

    pub fn locate(&self, key: impl AsRef<[u8]>) -> Result<Arc<Node<D>>, RingError> {
        let ring = self.current.load();
        let id = ring.locate_id(key)?;
        ring.node(id).cloned().ok_or(RingError::NoAvailableNode)
    }

    pub fn locate_id(&self, key: impl AsRef<[u8]>) -> Result<NodeId, RingError> {
        self.current.load().locate_id(key).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.current.load().node_count()
    }

    pub fn vnode_count(&self) -> usize {
        self.current.load().vnode_count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.current.load().contains_node(id)
    }

    /// Registers `node` and publishes the ranges it takes over.
    ///
    /// Re-registering an id is published as a leave followed by a join.
    pub fn add_node(&self, node: Node<D>) -> Option<Arc<Node<D>>> {
        let _guard = self.writer.lock();
        let before = self.current.load_full();
        let id = node.id().clone();

        let mut after = (*before).clone();
        let previous = after.add_node(node);
        let after = Arc::new(after);
        self.current.store(Arc::clone(&after));

        if previous.is_some() {
            let mut departed = (*before).clone();
            departed.remove_node(&id);
            self.coordinator.on_node_removed(&before, &departed, &id);
            self.coordinator.on_node_added(&departed, &after, &id);
        } else {
            self.coordinator.on_node_added(&before, &after, &id);
        }
        previous
    }

    /// Unregisters `id` and publishes the ranges its successors inherit.
    pub fn remove_node(&self, id: &str) -> Option<Arc<Node<D>>> {
        let _guard = self.writer.lock();
        let before = self.current.load_full();
        if !before.contains_node(id) {
            return None;
        }

        let mut after = (*before).clone();
        let removed = after.remove_node(id);
        let after = Arc::new(after);
        self.current.store(Arc::clone(&after));

        self.coordinator.on_node_removed(&before, &after, id);
        removed
    }
}
