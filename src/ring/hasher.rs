//! Seeded hash capability used to place virtual nodes and keys on the ring.
//!
//! The ring only needs `hash(bytes, seed) -> u32` with good avalanche; no
//! placement invariant depends on a particular algorithm. [`Xxh32Hasher`]
//! is the default.

use std::fmt;

/// Maps bytes to a position on the 32-bit ring.
///
/// Implementations must be deterministic: the same `(bytes, seed)` always
/// yields the same position, across ring instances and processes.
pub trait KeyHasher: fmt::Debug + Send + Sync {
    fn hash(&self, bytes: &[u8], seed: u32) -> u32;
}

/// XXH32, seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Xxh32Hasher;

impl KeyHasher for Xxh32Hasher {
    #[inline]
    fn hash(&self, bytes: &[u8], seed: u32) -> u32 {
        xxhash_rust::xxh32::xxh32(bytes, seed)
    }
}
