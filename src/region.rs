use std::ptr::{self, NonNull};

use crate::{
    error::{PoolError, PoolResult},
    kernel::{page_size, request_memory, return_memory},
    utils::align,
};

/// The pool buffer: one contiguous mapping obtained from the OS at `init` and
/// given back when the region is dropped.
///
/// [`crate::kernel::request_memory`] gives us memory in whole pages, so the
/// mapping is usually a bit longer than the capacity the pool was asked for.
/// Only the first `capacity` bytes are ever handed out.
///
/// ```text
///  base                            base + capacity     base + mapped
///   |                                     |                  |
///   v                                     v                  v
///   +-------------------------------------+------------------+
///   |        addressable pool bytes       |   page padding   |
///   +-------------------------------------+------------------+
/// ```
///
/// All bookkeeping talks in offsets from `base`; pointers only appear at the
/// public edge of the allocator.
pub(crate) struct Region {
    /// Start of the mapping returned by [`request_memory`].
    base: NonNull<u8>,
    /// Number of bytes the pool may hand out.
    capacity: usize,
    /// Actual length of the mapping, a multiple of the page size.
    mapped: usize,
}

// The region only hands out raw pointers; synchronizing access to the bytes
// behind them is the pool's (and its callers') business.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Maps a fresh region able to hold `capacity` bytes.
    ///
    /// A zero capacity still maps one page so that the base is a real,
    /// stable address that zero-size allocations can point at.
    pub(crate) fn map(capacity: usize) -> PoolResult<Self> {
        let mapped = align(capacity.max(1), page_size()).ok_or(PoolError::MapFailed {
            len: capacity,
        })?;

        let base = unsafe { request_memory(mapped) }.ok_or(PoolError::MapFailed { len: mapped })?;

        Ok(Self {
            base,
            capacity,
            mapped,
        })
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pointer to the byte at `offset`.
    #[inline]
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset <= self.capacity, "offset {offset} outside of pool");

        // SAFETY: `offset` is within the mapping (capacity <= mapped).
        unsafe { self.base.add(offset) }
    }

    /// Offset of `ptr` from the base, if it points inside the pool.
    #[inline]
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;

        addr.checked_sub(base).filter(|offset| *offset <= self.capacity)
    }

    /// Copies `len` bytes from offset `from` to offset `to`. The two ranges
    /// are allowed to overlap.
    ///
    /// **SAFETY**: both ranges must lie within the pool and no other thread
    /// may be accessing them.
    pub(crate) unsafe fn copy_within(&self, from: usize, to: usize, len: usize) {
        debug_assert!(from + len <= self.capacity && to + len <= self.capacity);

        unsafe {
            ptr::copy(
                self.ptr_at(from).as_ptr(),
                self.ptr_at(to).as_ptr(),
                len,
            );
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: the mapping came from `request_memory` with this length and
        // the pool drops the region only once its blocks are discarded.
        unsafe { return_memory(self.base, self.mapped) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_rounded_to_pages() {
        let region = Region::map(100).unwrap();

        assert_eq!(region.capacity(), 100);
        assert_eq!(region.mapped % page_size(), 0);
        assert!(region.mapped >= 100);
    }

    #[test]
    fn zero_capacity_still_has_a_base() {
        let region = Region::map(0).unwrap();

        assert_eq!(region.capacity(), 0);
        assert_eq!(region.ptr_at(0), region.base());
    }

    #[test]
    fn offsets_round_trip_through_pointers() {
        let region = Region::map(64).unwrap();

        assert_eq!(region.offset_of(region.ptr_at(17)), Some(17));
        assert_eq!(region.offset_of(region.ptr_at(64)), Some(64));

        let outside = NonNull::new(region.base().as_ptr().wrapping_add(65)).unwrap();
        assert_eq!(region.offset_of(outside), None);
    }

    #[test]
    fn overlapping_copy_moves_bytes() {
        let region = Region::map(16).unwrap();

        unsafe {
            for i in 0..8 {
                region.ptr_at(i).as_ptr().write(i as u8 + 1);
            }
            region.copy_within(0, 4, 8);

            let moved: Vec<u8> = (4..12).map(|i| *region.ptr_at(i).as_ptr()).collect();
            assert_eq!(moved, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }
}
