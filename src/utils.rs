//! Helper functions that don't particularly belong to any concrete module of the crate.

/// Rounds `to_be_aligned` up to the next multiple of `alignment`, which must be
/// a power of two. Returns `None` if the result does not fit in a `usize`.
///
/// The pool uses this to turn a requested capacity into a mapping length that
/// is a multiple of [`crate::kernel::page_size`], since the OS hands out memory
/// in whole pages.
pub(crate) fn align(to_be_aligned: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());

    to_be_aligned
        .checked_add(alignment - 1)
        .map(|value| value & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn align_pointer_size() {
        let word = mem::size_of::<usize>();
        let alignments = vec![
            (1..word + 1, word),
            (word + 1..2 * word + 1, 2 * word),
            (2 * word + 1..3 * word + 1, 3 * word),
        ];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, word));
            }
        }
    }

    #[test]
    fn align_page_size() {
        // For testing purposes we are assuming the page size is 4096
        let alignments = vec![(1..4097, 4096), (4097..8193, 8192)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 4096));
            }
        }
    }

    #[test]
    fn align_overflow_is_reported() {
        assert_eq!(None, align(usize::MAX - 10, 4096));
        assert_eq!(Some(0), align(0, 4096));
    }
}
