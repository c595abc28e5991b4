//! Lazy ascending iteration over the values of a range set.

use crate::range::Range;

/// Iterator over the values of a [`RangeSet`](crate::RangeSet), ascending.
///
/// Borrowed from the set; materializes nothing, so iterating a set like
/// `"1-1000000000"` allocates no intermediate storage.
#[derive(Debug, Clone)]
pub struct RangeIterator<'a> {
    ranges: std::slice::Iter<'a, Range>,
    /// `(next value, high bound)` of the range currently being walked.
    current: Option<(u64, u64)>,
}

impl<'a> RangeIterator<'a> {
    pub(crate) fn new(ranges: &'a [Range]) -> Self {
        Self {
            ranges: ranges.iter(),
            current: None,
        }
    }
}

impl Iterator for RangeIterator<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if let Some((next, high)) = self.current {
                // `next < high` keeps `next + 1` in bounds even at u64::MAX.
                self.current = if next < high {
                    Some((next + 1, high))
                } else {
                    None
                };
                return Some(next);
            }
            let range = self.ranges.next()?;
            self.current = Some((range.low(), range.high()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let mut remaining = self
            .current
            .map_or(0u64, |(next, high)| (high - next).saturating_add(1));
        for range in self.ranges.as_slice() {
            remaining = remaining.saturating_add(range.count());
        }
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
