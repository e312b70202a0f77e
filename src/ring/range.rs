//! Half-open hash ranges on the wrapping 32-bit ring.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size of the ring's hash space (`2^32`).
pub const RING_SPACE: u64 = 1 << 32;

/// The range `(start, end]` on the ring, wrapping past `u32::MAX`.
///
/// `start == end` denotes the whole ring: this is the range owned by the
/// only virtual node of a single-vnode ring.
///
/// ```
/// use shardkit::ring::HashRange;
///
/// let wrapping = HashRange::new(u32::MAX - 1, 5);
/// assert!(wrapping.contains(u32::MAX));
/// assert!(wrapping.contains(0));
/// assert!(wrapping.contains(5));
/// assert!(!wrapping.contains(6));
/// assert!(!wrapping.contains(u32::MAX - 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HashRange {
    /// Exclusive lower bound.
    pub start: u32,
    /// Inclusive upper bound.
    pub end: u32,
}

impl HashRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn is_full(&self) -> bool {
        self.start == self.end
    }

    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, hash: u32) -> bool {
        if self.is_full() {
            true
        } else if self.wraps() {
            hash > self.start || hash <= self.end
        } else {
            hash > self.start && hash <= self.end
        }
    }

    /// Number of hash values covered.
    pub fn len(&self) -> u64 {
        if self.is_full() {
            RING_SPACE
        } else {
            u64::from(self.end.wrapping_sub(self.start))
        }
    }

    /// Never true: the narrowest range still covers its end point.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for HashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_range_bounds() {
        let r = HashRange::new(10, 20);
        assert!(!r.contains(10));
        assert!(r.contains(11));
        assert!(r.contains(20));
        assert!(!r.contains(21));
        assert_eq!(r.len(), 10);
        assert!(!r.wraps());
    }

    #[test]
    fn wrapping_range_length() {
        let r = HashRange::new(u32::MAX - 9, 9);
        assert!(r.wraps());
        assert_eq!(r.len(), 19);
    }

    #[test]
    fn full_range_contains_everything() {
        let r = HashRange::new(7, 7);
        assert!(r.is_full());
        assert!(r.contains(0));
        assert!(r.contains(7));
        assert!(r.contains(u32::MAX));
        assert_eq!(r.len(), RING_SPACE);
    }

    #[test]
    fn display_uses_interval_notation() {
        assert_eq!(HashRange::new(1, 2).to_string(), "(1, 2]");
    }
}
