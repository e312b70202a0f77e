//! Ring shape parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Virtual nodes per unit of weight when nothing else is configured.
pub const DEFAULT_REPLICAS: u32 = 160;

/// Upper bound on `replicas`; keeps a single registration from flooding the
/// ring with millions of positions.
pub const MAX_REPLICAS: u32 = 1 << 16;

/// Upper bound on the positions one node occupies, whatever
/// `replicas * weight` asks for. Extra positions are dropped with a warning.
pub const MAX_NODE_VNODES: usize = 1 << 18;

/// Shape of a [`HashRing`](crate::ring::HashRing).
///
/// Two rings can only be merged when their configurations are equal, since
/// the same node would otherwise land on different positions.
///
/// ```
/// use shardkit::ring::RingConfig;
///
/// let config = RingConfig::default().with_replicas(64).with_seed(7);
/// assert!(config.validate().is_ok());
/// assert!(RingConfig::new(0, 0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RingConfig {
    /// Virtual nodes per unit of node weight.
    pub replicas: u32,
    /// Seed passed to the [`KeyHasher`](crate::ring::KeyHasher).
    pub seed: u32,
}

impl RingConfig {
    pub fn new(replicas: u32, seed: u32) -> Self {
        Self { replicas, seed }
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replicas == 0 {
            return Err(ConfigError::new("replicas must be > 0"));
        }
        if self.replicas > MAX_REPLICAS {
            return Err(ConfigError::new(format!(
                "replicas must be <= {MAX_REPLICAS}, got {}",
                self.replicas
            )));
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS, 0)
    }
}
