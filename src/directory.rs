use std::{collections::HashMap, ops::Range};

use crate::{
    block::Block,
    list::{Link, List, NodeId},
};

/// Address-ordered record of every live [`Block`] in the pool.
///
/// Blocks are kept in a [`List`] sorted by `start`, and an index maps each
/// block's start offset to its node so that `free` does not have to walk
/// the list to find the block a pointer refers to.
///
/// Free space is never stored. It is computed on demand as the gaps between
/// the boundaries
///
/// ```text
///   0, b0.start, b0.end, b1.start, b1.end, ..., bN.end, capacity
/// ```
///
/// taken pairwise. See [`Directory::gaps`].
pub(crate) struct Directory {
    /// Live blocks sorted by address.
    blocks: List<Block>,
    /// Start offset of every live block to its node in `blocks`.
    index: HashMap<usize, NodeId>,
    /// Size of the pool the blocks live in.
    capacity: usize,
}

/// A free range between two blocks (or a pool boundary and a block).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Gap {
    /// Block right before the gap, `None` if the gap starts at the pool base.
    /// A block placed in this gap is inserted after this node.
    pub after: Link,
    /// The free offsets. May be empty when two blocks touch.
    pub range: Range<usize>,
}

impl Gap {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.range.end - self.range.start
    }
}

/// Iterator over the gaps of a [`Directory`], in address order.
pub(crate) struct Gaps<'a> {
    directory: &'a Directory,
    /// Block treated as if it were already free.
    skip: Link,
    cursor: Link,
    after: Link,
    start: usize,
    done: bool,
}

impl Directory {
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: List::new(),
            index: HashMap::new(),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Node of the block starting at `start`, if any.
    #[inline]
    pub fn lookup(&self, start: usize) -> Option<NodeId> {
        self.index.get(&start).copied()
    }

    pub fn block(&self, id: NodeId) -> Option<Block> {
        self.blocks.get(id).map(|node| node.data)
    }

    /// Live blocks in address order.
    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks.iter().map(|(_, block)| *block)
    }

    /// Total bytes covered by live blocks.
    pub fn used(&self) -> usize {
        self.iter().map(|block| block.len()).sum()
    }

    /// Every gap of the pool in address order, zero-width ones included.
    pub fn gaps(&self) -> Gaps<'_> {
        self.gaps_without(None)
    }

    /// Same as [`Directory::gaps`] but pretends the block `skip` is free, so
    /// its range merges with the gaps around it.
    pub fn gaps_without(&self, skip: Link) -> Gaps<'_> {
        Gaps {
            directory: self,
            skip,
            cursor: self.blocks.first(),
            after: None,
            start: 0,
            done: false,
        }
    }

    /// First gap, by address, that can hold `size` bytes.
    ///
    /// This is first-fit, not best-fit: the front of the pool is always
    /// preferred, which keeps the search deterministic at the cost of some
    /// fragmentation under certain alloc/free patterns.
    pub fn find_first_fit(&self, size: usize, skip: Link) -> Option<Gap> {
        self.gaps_without(skip).find(|gap| gap.len() >= size)
    }

    pub fn largest_gap(&self) -> usize {
        self.gaps().map(|gap| gap.len()).max().unwrap_or(0)
    }

    /// Places a block of `len` bytes at the start of `gap`.
    pub fn insert(&mut self, gap: &Gap, len: usize) -> NodeId {
        debug_assert!(len <= gap.len());

        let block = Block::new(gap.range.start, len);
        let id = self.blocks.insert_after(gap.after, block);
        self.index.insert(block.start, id);

        id
    }

    /// Forgets the block `id`, turning its range into free space.
    pub fn remove(&mut self, id: NodeId) -> Option<Block> {
        let block = self.blocks.remove(id)?;
        self.index.remove(&block.start);

        Some(block)
    }

    /// Moves block `id` into `gap` (found with `id` skipped) with a new
    /// length. Returns the node of the moved block.
    pub fn relocate(&mut self, id: NodeId, gap: &Gap, len: usize) -> NodeId {
        debug_assert_ne!(gap.after, Some(id));

        self.remove(id);
        self.insert(gap, len)
    }

    /// Drops every block at once.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.index.clear();
    }

    /// Panics if the blocks are not sorted, overlap, or leave the pool.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        let mut previous_end = 0;

        for block in self.iter() {
            assert!(block.start < block.end, "empty block {block:?}");
            assert!(previous_end <= block.start, "block {block:?} overlaps");
            assert_eq!(self.lookup(block.start).and_then(|id| self.block(id)), Some(block));
            previous_end = block.end;
        }

        assert!(previous_end <= self.capacity, "block past the pool end");
        assert_eq!(self.index.len(), self.blocks.len());
    }
}

impl Iterator for Gaps<'_> {
    type Item = Gap;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let blocks = &self.directory.blocks;

        while self.cursor.is_some() && self.cursor == self.skip {
            self.cursor = self.cursor.and_then(|id| blocks.get(id)?.next);
        }

        let node = self.cursor.and_then(|id| Some((id, blocks.get(id)?)));

        match node {
            Some((id, node)) => {
                let gap = Gap {
                    after: self.after,
                    range: self.start..node.data.start,
                };
                self.after = Some(id);
                self.start = node.data.end;
                self.cursor = node.next;

                Some(gap)
            }
            None => {
                self.done = true;

                Some(Gap {
                    after: self.after,
                    range: self.start..self.directory.capacity,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap_ranges(directory: &Directory) -> Vec<Range<usize>> {
        directory.gaps().map(|gap| gap.range).collect()
    }

    fn place(directory: &mut Directory, size: usize) -> NodeId {
        let gap = directory.find_first_fit(size, None).unwrap();
        directory.insert(&gap, size)
    }

    #[test]
    fn empty_directory_is_one_gap() {
        let directory = Directory::new(100);

        assert_eq!(gap_ranges(&directory), vec![0..100]);
        assert_eq!(directory.largest_gap(), 100);
        assert_eq!(directory.used(), 0);
    }

    #[test]
    fn gaps_are_the_complement_of_blocks() {
        let mut directory = Directory::new(100);

        let a = place(&mut directory, 10);
        place(&mut directory, 20);
        place(&mut directory, 30);
        directory.remove(a);

        assert_eq!(gap_ranges(&directory), vec![0..10, 30..30, 60..100]);
        assert_eq!(directory.used(), 50);
        directory.assert_consistent();
    }

    #[test]
    fn first_fit_prefers_the_front() {
        let mut directory = Directory::new(100);

        let a = place(&mut directory, 40);
        place(&mut directory, 30);
        directory.remove(a);

        // [0, 40) and [70, 100) are free; 20 fits in both.
        let gap = directory.find_first_fit(20, None).unwrap();
        assert_eq!(gap.range, 0..40);
        assert_eq!(gap.after, None);

        assert!(directory.find_first_fit(50, None).is_none());
        assert_eq!(directory.largest_gap(), 40);
    }

    #[test]
    fn insert_lands_between_neighbours() {
        let mut directory = Directory::new(100);

        place(&mut directory, 10);
        let b = place(&mut directory, 10);
        place(&mut directory, 10);
        directory.remove(b);

        let id = place(&mut directory, 5);
        assert_eq!(directory.block(id), Some(Block::new(10, 5)));

        let starts: Vec<usize> = directory.iter().map(|block| block.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
        directory.assert_consistent();
    }

    #[test]
    fn skipped_block_merges_with_surrounding_gaps() {
        let mut directory = Directory::new(100);

        place(&mut directory, 10);
        let b = place(&mut directory, 20);
        place(&mut directory, 30);

        let ranges: Vec<_> = directory.gaps_without(Some(b)).map(|gap| gap.range).collect();
        assert_eq!(ranges, vec![0..0, 10..30, 60..100]);

        let gap = directory.find_first_fit(25, Some(b)).unwrap();
        assert_eq!(gap.range, 60..100);
    }

    #[test]
    fn relocate_moves_and_reindexes() {
        let mut directory = Directory::new(100);

        place(&mut directory, 10);
        let b = place(&mut directory, 10);
        place(&mut directory, 10);

        let gap = directory.find_first_fit(40, Some(b)).unwrap();
        let moved = directory.relocate(b, &gap, 40);

        assert_eq!(directory.block(moved), Some(Block::new(30, 40)));
        assert_eq!(directory.lookup(10), None);
        assert_eq!(directory.lookup(30), Some(moved));
        directory.assert_consistent();
    }

    #[test]
    fn clear_forgets_everything() {
        let mut directory = Directory::new(100);

        place(&mut directory, 10);
        place(&mut directory, 10);
        directory.clear();

        assert!(directory.is_empty());
        assert_eq!(directory.lookup(0), None);
        assert_eq!(gap_ranges(&directory), vec![0..100]);
    }
}
