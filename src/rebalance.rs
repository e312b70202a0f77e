//! # Rebalance Planning
//!
//! Computes which hash ranges change owner when a node joins or leaves the
//! ring, and publishes them as [`MigrationEvent`]s.
//!
//! ## Node added
//!
//! ```text
//!   before:   ──── A(10) ─────────────────── B(90) ────
//!   after:    ──── A(10) ─────── N(50) ───── B(90) ────
//!
//!   N's range (10, 50] used to belong to B (the successor of 50 before
//!   the join):   Migrate (10, 50]  B -> N
//! ```
//!
//! ## Node removed
//!
//! ```text
//!   before:   ──── A(10) ─────── N(50) ───── B(90) ────
//!   after:    ──── A(10) ─────────────────── B(90) ────
//!
//!   N's range (10, 50] now falls to the successor of 50 after the leave:
//!                Reassign (10, 50]  N -> B
//! ```
//!
//! The emitted ranges are exactly the hashes whose `locate` result changes;
//! nothing else moves. Events are advisory: the coordinator never copies
//! data, and a consumer that has gone away does not fail the mutation.

use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ring::{HashRange, HashRing, NodeId};

/// Why a range changes owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MigrationKind {
    /// A joining node takes the range over from its previous owner.
    Migrate,
    /// A leaving node hands the range to its successor.
    Reassign,
}

/// One range whose owner changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MigrationEvent {
    pub kind: MigrationKind,
    pub range: HashRange,
    pub from: NodeId,
    pub to: NodeId,
}

impl fmt::Display for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            MigrationKind::Migrate => "migrate",
            MigrationKind::Reassign => "reassign",
        };
        write!(f, "{verb} {} from {} -> {}", self.range, self.from, self.to)
    }
}

/// Plans migrations and forwards them to an event consumer.
///
/// ```
/// use shardkit::rebalance::{MigrationKind, RebalanceCoordinator};
/// use shardkit::ring::{HashRing, Node};
///
/// let (coordinator, events) = RebalanceCoordinator::channel();
///
/// let mut before = HashRing::new(8);
/// before.add_node(Node::new("a", 1));
/// let mut after = before.clone();
/// after.add_node(Node::new("b", 1));
///
/// let sent = coordinator.on_node_added(&before, &after, "b");
/// assert_eq!(sent, 8);
/// assert!(events.try_iter().all(|e| e.kind == MigrationKind::Migrate));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RebalanceCoordinator {
    sender: Option<Sender<MigrationEvent>>,
}

impl RebalanceCoordinator {
    /// Coordinator publishing into `sender`.
    pub fn new(sender: Sender<MigrationEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Coordinator that only logs its plans.
    pub fn detached() -> Self {
        Self { sender: None }
    }

    /// Coordinator plus the receiving end of an unbounded event stream.
    pub fn channel() -> (Self, Receiver<MigrationEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Ranges `id` takes over by joining `before` to produce `after`.
    ///
    /// One event per virtual node of `id`, in ascending hash order. Joining
    /// an empty ring moves nothing.
    pub fn plan_node_added<D>(
        before: &HashRing<D>,
        after: &HashRing<D>,
        id: &str,
    ) -> Vec<MigrationEvent> {
        if before.is_empty() {
            return Vec::new();
        }
        let mut events = Vec::new();
        for vnode in after.vnodes_of(id) {
            let Some(prev) = after.predecessor(vnode.hash()) else {
                continue;
            };
            let Some(owner) = before.successor(vnode.hash()) else {
                continue;
            };
            if owner.node_id().as_str() == id {
                continue;
            }
            events.push(MigrationEvent {
                kind: MigrationKind::Migrate,
                range: HashRange::new(prev.hash(), vnode.hash()),
                from: owner.node_id().clone(),
                to: vnode.node_id().clone(),
            });
        }
        events
    }

    /// Ranges `id` gives up by leaving `before` to produce `after`.
    ///
    /// Removing the last node produces no events: nobody is left to take
    /// the data.
    pub fn plan_node_removed<D>(
        before: &HashRing<D>,
        after: &HashRing<D>,
        id: &str,
    ) -> Vec<MigrationEvent> {
        if after.is_empty() {
            if before.contains_node(id) {
                warn!(node = id, "last node left the ring, its data has no new owner");
            }
            return Vec::new();
        }
        let mut events = Vec::new();
        for vnode in before.vnodes_of(id) {
            let Some(prev) = before.predecessor(vnode.hash()) else {
                continue;
            };
            let Some(heir) = after.successor(vnode.hash()) else {
                continue;
            };
            if heir.node_id().as_str() == id {
                continue;
            }
            events.push(MigrationEvent {
                kind: MigrationKind::Reassign,
                range: HashRange::new(prev.hash(), vnode.hash()),
                from: vnode.node_id().clone(),
                to: heir.node_id().clone(),
            });
        }
        events
    }

    /// Plans a join and publishes the result. Returns the number of events.
    pub fn on_node_added<D>(&self, before: &HashRing<D>, after: &HashRing<D>, id: &str) -> usize {
        let events = Self::plan_node_added(before, after, id);
        debug!(node = id, ranges = events.len(), "planned migrations for join");
        self.publish(events)
    }

    /// Plans a leave and publishes the result. Returns the number of events.
    pub fn on_node_removed<D>(&self, before: &HashRing<D>, after: &HashRing<D>, id: &str) -> usize {
        let events = Self::plan_node_removed(before, after, id);
        debug!(node = id, ranges = events.len(), "planned reassignments for leave");
        self.publish(events)
    }

    /// Sends `events` in order without blocking.
    pub fn publish(&self, events: Vec<MigrationEvent>) -> usize {
        let count = events.len();
        for event in events {
            trace!(%event, "rebalance event");
            if let Some(sender) = &self.sender
                && sender.send(event).is_err()
            {
                warn!("rebalance event consumer disconnected, dropping remaining events");
                break;
            }
        }
        count
    }
}
