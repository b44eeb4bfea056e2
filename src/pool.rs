use std::{ops::Range, ptr::NonNull};

use log::{debug, trace, warn};
use parking_lot::{const_rwlock, RwLock};

use crate::{
    config::PoolConfig,
    directory::Directory,
    error::{PoolError, PoolResult},
    region::Region,
};

/// A first-fit allocator over one fixed-size pool.
///
/// The pool is mapped once by [`MemPool::init`] and released by
/// [`MemPool::deinit`]. In between, [`MemPool::alloc`], [`MemPool::free`] and
/// [`MemPool::resize`] hand out and reclaim byte ranges of it, without going
/// back to the OS:
///
/// ```text
///                       MemPool
///  +-----------------------------------------------------+
///  | RwLock                                              |
///  |  +-----------------------------------------------+  |
///  |  | Region: base, capacity                        |  |
///  |  | Directory: [0,40) -> [40,70) -> [90,100)      |  |
///  |  +-----------------------------------------------+  |
///  +-----------------------------------------------------+
/// ```
///
/// Every operation runs as one critical section. Operations that change the
/// pool take the write side of the lock; inspection ([`MemPool::stats`],
/// [`MemPool::blocks`], ...) only takes the read side.
///
/// ```
/// use poolalloc::MemPool;
///
/// let pool = MemPool::new();
/// pool.init(100).unwrap();
///
/// let a = pool.alloc(40).unwrap();
/// let b = pool.alloc(30).unwrap();
/// pool.free(a).unwrap();
///
/// // 70 bytes are free, but the largest gap only holds 40.
/// assert!(pool.alloc(50).is_err());
/// assert_eq!(pool.alloc(40).unwrap(), a);
/// # pool.free(b).unwrap();
/// # pool.deinit();
/// ```
pub struct MemPool {
    state: RwLock<Option<PoolState>>,
}

/// Snapshot of how a pool is being used.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Size of the pool in bytes.
    pub capacity: usize,
    /// Bytes covered by live blocks.
    pub used: usize,
    /// Bytes not covered by any block, `capacity - used`.
    pub free: usize,
    /// Largest contiguous free range, in bytes.
    pub largest_gap: usize,
    /// Number of live blocks.
    pub blocks: usize,
}

/// Everything the lock protects. Methods on this type assume the caller holds
/// the lock, which is what lets `resize` chain several steps in one critical
/// section.
struct PoolState {
    region: Region,
    directory: Directory,
    config: PoolConfig,
}

impl PoolState {
    fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        let region = Region::map(config.capacity)?;
        let directory = Directory::new(config.capacity);

        Ok(Self {
            region,
            directory,
            config,
        })
    }

    fn alloc(&mut self, size: usize) -> PoolResult<NonNull<u8>> {
        let capacity = self.region.capacity();

        if size > capacity {
            return Err(PoolError::CapacityExceeded {
                requested: size,
                capacity,
            });
        }

        // Zero-size requests all alias the base and are not tracked.
        if size == 0 {
            return Ok(self.region.base());
        }

        if let Some(max_blocks) = self.config.max_blocks {
            if self.directory.len() >= max_blocks {
                warn!("block limit of {max_blocks} reached, refusing {size} bytes");
                return Err(self.out_of_memory(size));
            }
        }

        let Some(gap) = self.directory.find_first_fit(size, None) else {
            let err = self.out_of_memory(size);
            warn!("{err}");
            return Err(err);
        };

        self.directory.insert(&gap, size);
        trace!("alloc {size} bytes at offset {}", gap.range.start);

        Ok(self.region.ptr_at(gap.range.start))
    }

    fn free(&mut self, ptr: NonNull<u8>) -> PoolResult<()> {
        let id = self
            .region
            .offset_of(ptr)
            .and_then(|offset| self.directory.lookup(offset))
            .ok_or(PoolError::InvalidPointer(ptr.as_ptr() as usize))?;

        if let Some(block) = self.directory.remove(id) {
            trace!("free {} bytes at offset {}", block.len(), block.start);
        }

        Ok(())
    }

    /// Grows or shrinks the block at `ptr` to `size` bytes (`size > 0`).
    ///
    /// The block is placed where freeing it and allocating `size` bytes would
    /// place it, but nothing changes until that spot is known to exist. A
    /// failed resize leaves the block exactly where it was.
    fn resize(&mut self, ptr: NonNull<u8>, size: usize) -> PoolResult<NonNull<u8>> {
        let invalid = PoolError::InvalidPointer(ptr.as_ptr() as usize);

        let id = self
            .region
            .offset_of(ptr)
            .and_then(|offset| self.directory.lookup(offset))
            .ok_or(invalid.clone())?;
        let old = self.directory.block(id).ok_or(invalid)?;

        let capacity = self.region.capacity();
        if size > capacity {
            return Err(PoolError::CapacityExceeded {
                requested: size,
                capacity,
            });
        }

        let Some(gap) = self.directory.find_first_fit(size, Some(id)) else {
            let err = self.out_of_memory(size);
            warn!("resize of block at offset {} failed: {err}", old.start);
            return Err(err);
        };

        self.directory.relocate(id, &gap, size);

        let new_start = gap.range.start;
        if new_start != old.start {
            // SAFETY: both ranges are inside the pool. The old one belongs to
            // the caller, the new one lies in what was free space plus the
            // old block, so nobody else can be touching either.
            unsafe {
                self.region
                    .copy_within(old.start, new_start, size.min(old.len()));
            }
        }

        trace!(
            "resize {} -> {size} bytes, offset {} -> {new_start}",
            old.len(),
            old.start
        );

        Ok(self.region.ptr_at(new_start))
    }

    fn out_of_memory(&self, size: usize) -> PoolError {
        PoolError::OutOfMemory {
            requested: size,
            largest_gap: self.directory.largest_gap(),
        }
    }

    fn stats(&self) -> PoolStats {
        let capacity = self.region.capacity();
        let used = self.directory.used();

        PoolStats {
            capacity,
            used,
            free: capacity - used,
            largest_gap: self.directory.largest_gap(),
            blocks: self.directory.len(),
        }
    }
}

impl MemPool {
    /// Creates an uninitialized pool. Usable in `static` items.
    pub const fn new() -> Self {
        Self {
            state: const_rwlock(None),
        }
    }

    /// Creates a pool and initializes it with `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> PoolResult<Self> {
        let pool = Self::new();
        pool.init(capacity)?;

        Ok(pool)
    }

    /// Maps a pool of `capacity` bytes. See [`MemPool::init_with`].
    pub fn init(&self, capacity: usize) -> PoolResult<()> {
        self.init_with(PoolConfig::new(capacity))
    }

    /// Maps a fresh pool described by `config` and starts with no blocks.
    ///
    /// Fails with [`PoolError::AlreadyInitialized`] if the pool is live; call
    /// [`MemPool::deinit`] first.
    pub fn init_with(&self, config: PoolConfig) -> PoolResult<()> {
        let mut state = self.state.write();

        if let Some(live) = state.as_ref() {
            return Err(PoolError::AlreadyInitialized {
                capacity: live.region.capacity(),
            });
        }

        let fresh = PoolState::new(config)?;
        debug!(
            "pool initialized: {} bytes at {:p}",
            fresh.region.capacity(),
            fresh.region.base()
        );
        *state = Some(fresh);

        Ok(())
    }

    /// Allocates exactly `size` bytes from the pool.
    ///
    /// The first free gap, by address, that can hold `size` bytes is used.
    /// Free space is never compacted, so a request can fail even though the
    /// pool has enough free bytes in total.
    ///
    /// A zero-size request returns the pool base and is not tracked: it can't
    /// be freed, and every such request gets the same address.
    pub fn alloc(&self, size: usize) -> PoolResult<NonNull<u8>> {
        self.state
            .write()
            .as_mut()
            .ok_or(PoolError::Uninitialized)?
            .alloc(size)
    }

    /// Returns the block starting at `ptr` to the pool.
    ///
    /// A pointer that doesn't start a live block (already freed, from another
    /// pool, or the base handed out for a zero-size request) is reported as
    /// [`PoolError::InvalidPointer`] and changes nothing.
    pub fn free(&self, ptr: NonNull<u8>) -> PoolResult<()> {
        self.state
            .write()
            .as_mut()
            .ok_or(PoolError::Uninitialized)?
            .free(ptr)
    }

    /// Changes the size of a block, possibly moving it.
    ///
    /// - `ptr == None` allocates `size` bytes, like [`MemPool::alloc`].
    /// - `size == 0` frees `ptr` and returns `None`.
    /// - Otherwise the block is placed at the first gap that fits `size`
    ///   bytes, counting its own range as free. If it moves, the first
    ///   `min(size, old size)` bytes are copied over.
    ///
    /// On failure the block stays where it was, with its contents untouched.
    pub fn resize(&self, ptr: Option<NonNull<u8>>, size: usize) -> PoolResult<Option<NonNull<u8>>> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(PoolError::Uninitialized)?;

        match (ptr, size) {
            (Some(ptr), 0) => state.free(ptr).map(|()| None),
            (None, 0) => Ok(None),
            (None, size) => state.alloc(size).map(Some),
            (Some(ptr), size) => state.resize(ptr, size).map(Some),
        }
    }

    /// Releases the pool and forgets every block. Pointers handed out before
    /// become dangling. Does nothing on an uninitialized pool.
    pub fn deinit(&self) {
        let Some(mut state) = self.state.write().take() else {
            debug!("deinit on an uninitialized pool");
            return;
        };

        if !state.directory.is_empty() {
            warn!(
                "pool released with {} live blocks ({} bytes)",
                state.directory.len(),
                state.directory.used()
            );
        }

        state.directory.clear();
        debug!("pool released: {} bytes", state.region.capacity());
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Capacity of the live pool, `None` when uninitialized.
    pub fn capacity(&self) -> Option<usize> {
        self.state.read().as_ref().map(|state| state.region.capacity())
    }

    /// Whether `ptr` starts a live block.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.state.read().as_ref().is_some_and(|state| {
            state
                .region
                .offset_of(ptr)
                .and_then(|offset| state.directory.lookup(offset))
                .is_some()
        })
    }

    pub fn stats(&self) -> PoolResult<PoolStats> {
        self.state
            .read()
            .as_ref()
            .map(PoolState::stats)
            .ok_or(PoolError::Uninitialized)
    }

    /// Live blocks as offsets from the pool base, in address order.
    pub fn blocks(&self) -> PoolResult<Vec<Range<usize>>> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.directory.iter().map(|block| block.range()).collect())
            .ok_or(PoolError::Uninitialized)
    }
}

impl Default for MemPool {
    fn default() -> Self {
        Self::new()
    }
}
