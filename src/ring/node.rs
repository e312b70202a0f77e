//! Physical node identity and weight.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ring::config::MAX_NODE_VNODES;

/// Largest accepted node weight. `Node::new` clamps to it, `Node::try_new`
/// rejects anything above.
pub const MAX_WEIGHT: u32 = 1 << 12;

/// Opaque, cheaply clonable node identifier.
///
/// Dereferences to `str`, so ring methods taking `&str` accept `&NodeId`
/// directly.
///
/// ```
/// use shardkit::ring::NodeId;
///
/// let id = NodeId::from_host_port("10.0.0.1", 6379);
/// assert_eq!(id.as_str(), "10.0.0.1:6379");
/// assert_eq!(id, NodeId::from("10.0.0.1:6379"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(Arc<str>);

impl NodeId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// `"host:port"`, the conventional identity for a cache server.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(format!("{host}:{port}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for NodeId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical cache shard as registered on the ring.
///
/// `weight` multiplies the number of virtual nodes the shard receives, so a
/// weight-2 node claims roughly twice the key space of a weight-1 node.
/// `data` is an opaque payload the caller may attach (connection info, a
/// handle to the shard's storage, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<D = ()> {
    id: NodeId,
    weight: u32,
    data: D,
}

impl Node<()> {
    /// Creates a payload-less node. The weight is clamped into
    /// `1..=MAX_WEIGHT`.
    pub fn new(id: impl Into<NodeId>, weight: u32) -> Self {
        Self::with_data(id, weight, ())
    }

    /// Creates a payload-less node, rejecting a weight outside
    /// `1..=MAX_WEIGHT`.
    pub fn try_new(id: impl Into<NodeId>, weight: u32) -> Result<Self, ConfigError> {
        Self::try_with_data(id, weight, ())
    }
}

impl<D> Node<D> {
    pub fn with_data(id: impl Into<NodeId>, weight: u32, data: D) -> Self {
        Self {
            id: id.into(),
            weight: weight.clamp(1, MAX_WEIGHT),
            data,
        }
    }

    pub fn try_with_data(id: impl Into<NodeId>, weight: u32, data: D) -> Result<Self, ConfigError> {
        let id = id.into();
        if weight == 0 {
            return Err(ConfigError::new(format!(
                "node {id}: weight must be > 0"
            )));
        }
        if weight > MAX_WEIGHT {
            return Err(ConfigError::new(format!(
                "node {id}: weight must be <= {MAX_WEIGHT}, got {weight}"
            )));
        }
        if id.is_empty() {
            return Err(ConfigError::new("node id must not be empty"));
        }
        Ok(Self { id, weight, data })
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Number of ring positions requested for `replicas`, before
    /// hash deduplication.
    pub fn vnode_count(&self, replicas: u32) -> usize {
        (replicas as usize)
            .saturating_mul(self.weight as usize)
            .min(MAX_NODE_VNODES)
    }
}
