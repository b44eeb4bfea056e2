use std::ops::Range;

/// Descriptor of one live allocation: the `[start, end)` byte range it
/// occupies, as offsets from the pool base.
///
/// Free space never gets a `Block`. It is whatever lies between two
/// consecutive blocks of the [`crate::directory::Directory`]:
///
/// ```text
///  0                                                          capacity
///  +--------+----------+-------------------+--------+-----------+
///  |  gap   |  Block   |        gap        | Block  |    gap    |
///  +--------+----------+-------------------+--------+-----------+
///           ^          ^                   ^        ^
///         start       end                start     end
/// ```
///
/// A block is never empty: zero-size requests are answered without one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    /// First byte of the allocation.
    pub start: usize,
    /// One past the last byte of the allocation.
    pub end: usize,
}

impl Block {
    pub(crate) fn new(start: usize, len: usize) -> Self {
        debug_assert!(len > 0);

        Self {
            start,
            end: start + len,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub(crate) fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_covers_its_length() {
        let block = Block::new(40, 30);

        assert_eq!(block.end, 70);
        assert_eq!(block.len(), 30);
        assert_eq!(block.range(), 40..70);
    }
}
