//! A first-fit allocator over a single fixed-size pool.
//!
//! A [`MemPool`] maps one contiguous buffer from the OS when it is
//! initialized and hands out sub-ranges of it until it is torn down. The
//! bookkeeping is an address-ordered list of live blocks; free space is never
//! stored, it is the gaps between those blocks:
//!
//! ```text
//!   pool base                                                pool end
//!   +----------+--------+-------------+-------+-------------------+
//!   | block    |  gap   |    block    |  gap  |      block        |
//!   +----------+--------+-------------+-------+-------------------+
//! ```
//!
//! An allocation takes the first gap, by address, that can hold it. Gaps are
//! never compacted, so a pool can refuse a request while having enough free
//! bytes in total.
//!
//! All operations are serialized by a lock owned by the pool, so a single
//! `MemPool` can be shared between threads.

mod block;
mod config;
mod directory;
mod error;
mod kernel;
mod list;
mod pool;
mod region;
mod utils;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use pool::{MemPool, PoolStats};
