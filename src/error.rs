//! Error types for the shardkit library.
//!
//! ## Key Components
//!
//! - [`RingError`]: Returned by ring lookups and ring merges (empty ring,
//!   mismatched ring parameters).
//! - [`ConfigError`]: Returned when configuration parameters are invalid
//!   (e.g. zero replicas, zero weight, out-of-range adaptive parameters).
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (debug-only `check_invariants` methods).
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::error::RingError;
//! use shardkit::ring::HashRing;
//!
//! let ring: HashRing = HashRing::new(16);
//! assert_eq!(ring.locate("user:1").unwrap_err(), RingError::NoAvailableNode);
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// RingError
// ---------------------------------------------------------------------------

/// Error returned by hash ring operations.
///
/// Every variant is recoverable by the caller; none of them indicate a
/// corrupted ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// The ring holds no virtual nodes, so no key can be placed.
    NoAvailableNode,
    /// Two rings with different shape parameters were combined.
    ConfigMismatch {
        /// `(replicas, seed)` of the receiving ring.
        expected: (u32, u32),
        /// `(replicas, seed)` of the ring being merged in.
        found: (u32, u32),
    },
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::NoAvailableNode => f.write_str("no available node: ring is empty"),
            RingError::ConfigMismatch { expected, found } => write!(
                f,
                "ring configuration mismatch: expected replicas={} seed={}, found replicas={} seed={}",
                expected.0, expected.1, found.0, found.1
            ),
        }
    }
}

impl std::error::Error for RingError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`HashRing::try_new`](crate::ring::HashRing::try_new),
/// [`Node::try_new`](crate::ring::Node::try_new) and builder `try_build()`
/// methods. Carries a human-readable description of which parameter failed
/// validation.
///
/// # Example
///
/// ```
/// use shardkit::ring::{HashRing, RingConfig};
///
/// let err = HashRing::<()>::try_new(RingConfig::new(0, 0)).unwrap_err();
/// assert!(err.to_string().contains("replicas"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal invariants are violated.
///
/// Produced by `check_invariants` methods (e.g.
/// [`LfuCache::check_invariants`](crate::policy::lfu::LfuCache::check_invariants)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
