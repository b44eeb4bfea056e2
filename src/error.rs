//! Pool error types.

use thiserror::Error;

/// Result of a pool operation.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur while operating a [`crate::MemPool`].
///
/// Every failure is terminal for the call that produced it: no partial
/// allocation is ever handed out and the pool's bookkeeping is left exactly
/// as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has not been initialized, or has already been torn down.
    #[error("pool is not initialized")]
    Uninitialized,

    /// `init` was called on a pool that is still live.
    #[error("pool is already initialized with {capacity} bytes")]
    AlreadyInitialized {
        /// Capacity of the live pool.
        capacity: usize,
    },

    /// The request is larger than the whole pool.
    #[error("requested {requested} bytes, pool capacity is {capacity} bytes")]
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Total capacity of the pool.
        capacity: usize,
    },

    /// No single free gap is large enough, or the descriptor limit is reached.
    #[error("out of pool memory: requested {requested} bytes, largest free gap is {largest_gap} bytes")]
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Largest contiguous gap at the time of the request.
        largest_gap: usize,
    },

    /// The pointer does not start a live allocation of this pool.
    #[error("pointer 0x{0:x} is not a live allocation")]
    InvalidPointer(usize),

    /// The operating system refused to provide the pool buffer.
    #[error("failed to map {len} bytes for the pool")]
    MapFailed {
        /// Length of the mapping that was requested.
        len: usize,
    },

    /// The configuration cannot describe a usable pool.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_numbers() {
        let err = PoolError::OutOfMemory {
            requested: 50,
            largest_gap: 40,
        };
        assert_eq!(
            err.to_string(),
            "out of pool memory: requested 50 bytes, largest free gap is 40 bytes"
        );

        assert_eq!(
            PoolError::InvalidPointer(0xdead).to_string(),
            "pointer 0xdead is not a live allocation"
        );
    }
}
