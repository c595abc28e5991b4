//! A single inclusive range of `u64` values.

use std::fmt;

/// An inclusive range `low..=high` of unsigned 64-bit integers.
///
/// Ranges are the building block of [`RangeSet`](crate::RangeSet); on their
/// own they are plain value types with no canonicalization rules beyond
/// `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    low: u64,
    high: u64,
}

impl Range {
    /// Creates a range covering `low..=high`.
    ///
    /// # Panics
    ///
    /// Panics if `low > high`. Use [`Range::single`] for one-element ranges.
    #[must_use]
    pub fn new(low: u64, high: u64) -> Self {
        assert!(low <= high, "range low {low} exceeds high {high}");
        Self { low, high }
    }

    /// Creates a range containing exactly `value`.
    #[must_use]
    pub fn single(value: u64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    /// Lowest contained value.
    #[must_use]
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Highest contained value.
    #[must_use]
    pub fn high(&self) -> u64 {
        self.high
    }

    /// Returns `true` if `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        self.low <= value && value <= self.high
    }

    /// Number of contained values, saturating at `u64::MAX`.
    ///
    /// Only the full range `0..=u64::MAX` saturates; every other range has
    /// an exact count.
    #[must_use]
    pub fn count(&self) -> u64 {
        (self.high - self.low).saturating_add(1)
    }
}

impl fmt::Display for Range {
    /// Renders as `n` for single values and `n-m` otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_range() {
        let r = Range::single(7);
        assert_eq!(r.low(), 7);
        assert_eq!(r.high(), 7);
        assert_eq!(r.count(), 1);
        assert_eq!(r.to_string(), "7");
    }

    #[test]
    fn test_span_range() {
        let r = Range::new(3, 9);
        assert_eq!(r.count(), 7);
        assert_eq!(r.to_string(), "3-9");
        assert!(r.contains(3));
        assert!(r.contains(9));
        assert!(!r.contains(2));
        assert!(!r.contains(10));
    }

    #[test]
    fn test_degenerate_pair_displays_as_single() {
        assert_eq!(Range::new(5, 5).to_string(), "5");
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_descending_bounds_panic() {
        let _ = Range::new(9, 3);
    }

    #[test]
    fn test_count_saturates_on_full_domain() {
        let r = Range::new(0, u64::MAX);
        assert_eq!(r.count(), u64::MAX);
        assert_eq!(Range::new(1, u64::MAX).count(), u64::MAX);
    }
}
