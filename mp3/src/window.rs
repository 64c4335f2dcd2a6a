//! Bounded windowing of a stream.

use std::iter::FusedIterator;
use std::ops::Range;

/// Splits `0..total` into consecutive ranges of at most `size` items.
///
/// Every range but the last is exactly `size` long; an empty stream yields no
/// ranges at all.
#[derive(Debug, Clone)]
pub struct Windows {
    total: usize,
    size: usize,
    start: usize,
}

impl Windows {
    /// Creates the windowing of a stream of `total` items.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new(total: usize, size: usize) -> Self {
        assert!(size > 0, "window size must be positive");
        Self { total, size, start: 0 }
    }

    /// Items consumed by the ranges yielded so far.
    pub fn position(&self) -> usize {
        self.start
    }
}

impl Iterator for Windows {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.start >= self.total {
            return None;
        }
        let end = self.total.min(self.start + self.size);
        let window = self.start..end;
        self.start = end;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.total - self.start).div_ceil(self.size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows {}

impl FusedIterator for Windows {}
