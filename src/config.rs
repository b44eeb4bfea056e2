//! Pool configuration parameters.

use crate::error::{PoolError, PoolResult};

/// Configuration for a [`crate::MemPool`].
///
/// Validated at `init`; all values are immutable for the lifetime of one
/// init/deinit cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size of the pool buffer in bytes.
    pub capacity: usize,

    /// Upper bound on the number of live blocks the directory may track.
    ///
    /// Default: unbounded. Reaching the limit is reported exactly like a
    /// full pool, so callers see a single kind of exhaustion.
    pub max_blocks: Option<usize>,
}

impl PoolConfig {
    /// Create a config for a pool of `capacity` bytes with no block limit.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_blocks: None,
        }
    }

    /// Limit the number of simultaneously live blocks.
    pub const fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = Some(max_blocks);
        self
    }

    /// Checks that the configuration describes a pool we can map.
    pub fn validate(&self) -> PoolResult<()> {
        if self.capacity > isize::MAX as usize {
            return Err(PoolError::InvalidConfig("capacity exceeds isize::MAX"));
        }

        Ok(())
    }
}

impl From<usize> for PoolConfig {
    fn from(capacity: usize) -> Self {
        Self::new(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_is_unbounded() {
        let config = PoolConfig::new(100);
        assert_eq!(config.capacity, 100);
        assert_eq!(config.max_blocks, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_blocks_is_recorded() {
        let config = PoolConfig::new(100).with_max_blocks(3);
        assert_eq!(config.max_blocks, Some(3));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let config = PoolConfig::new(usize::MAX);
        assert!(matches!(config.validate(), Err(PoolError::InvalidConfig(_))));
    }
}
