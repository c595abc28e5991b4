//! Canonical sorted set of `u64` values stored as merged ranges.

use std::fmt;
use std::str::FromStr;

use crate::error::{RangeSetError, RangeSetResult};
use crate::iter::RangeIterator;
use crate::range::Range;

/// A set of `u64` values kept in canonical range form.
///
/// # Invariants
///
/// The internal range list is always canonical:
///
/// * ranges are sorted ascending,
/// * ranges never overlap,
/// * ranges never touch (a gap of at least one value separates neighbours).
///
/// Every constructor and mutator restores these invariants eagerly, so two
/// sets containing the same values always compare equal and render to the
/// same text.
///
/// # Text form
///
/// [`Display`](fmt::Display) renders the canonical form: comma-separated
/// tokens, each `n` or `n-m` with `m > n`, e.g. `"1-5,7,9-12"`. The empty
/// set renders as the empty string. [`FromStr`]/[`RangeSet::parse`] accept
/// only canonical input (plus degenerate `n-n` tokens, which normalize to
/// `n`), so anything this type printed parses back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Parses the canonical text form.
    ///
    /// The empty string parses to the empty set. Tokens must appear in
    /// strictly ascending order with at least one absent value between
    /// them; `n-n` is tolerated and normalizes to `n`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeSetError`] when a token is malformed, a bound is not
    /// a decimal `u64`, a pair descends, or tokens are out of order,
    /// overlapping, or adjacent.
    pub fn parse(text: &str) -> RangeSetResult<Self> {
        if text.is_empty() {
            return Ok(Self::new());
        }
        let mut ranges = Vec::new();
        let mut prev_high: Option<u64> = None;
        for token in text.split(',') {
            let range = parse_token(token)?;
            if let Some(high) = prev_high {
                // Adjacent tokens would have been merged by a canonical
                // writer, so they are rejected along with overlaps.
                if range.low() <= high.saturating_add(1) {
                    return Err(RangeSetError::out_of_order(token));
                }
            }
            prev_high = Some(range.high());
            ranges.push(range);
        }
        Ok(Self { ranges })
    }

    /// Returns `true` if the set contains no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of contained values, saturating at `u64::MAX`.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.ranges
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.count()))
    }

    /// Returns `true` if `value` is in the set.
    ///
    /// Binary search over the range list, `O(log n)` in the number of
    /// ranges.
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        let idx = self.ranges.partition_point(|r| r.high() < value);
        self.ranges.get(idx).is_some_and(|r| r.low() <= value)
    }

    /// Lowest contained value, or `None` for the empty set.
    #[must_use]
    pub fn lowest(&self) -> Option<u64> {
        self.ranges.first().map(Range::low)
    }

    /// Highest contained value, or `None` for the empty set.
    #[must_use]
    pub fn highest(&self) -> Option<u64> {
        self.ranges.last().map(Range::high)
    }

    /// The canonical range list backing the set.
    #[must_use]
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Inserts a single value, merging with neighbouring ranges as needed.
    ///
    /// Inserting a value already in the set is a no-op, so `add` is
    /// idempotent. A value bridging the gap between two ranges collapses
    /// them into one.
    pub fn add(&mut self, value: u64) {
        let idx = self.ranges.partition_point(|r| r.high() < value);
        if let Some(r) = self.ranges.get(idx) {
            if r.low() <= value {
                return;
            }
        }
        let touches_left =
            idx > 0 && self.ranges[idx - 1].high().checked_add(1) == Some(value);
        let touches_right = self
            .ranges
            .get(idx)
            .is_some_and(|r| value.checked_add(1) == Some(r.low()));
        match (touches_left, touches_right) {
            (true, true) => {
                let merged =
                    Range::new(self.ranges[idx - 1].low(), self.ranges[idx].high());
                self.ranges[idx - 1] = merged;
                self.ranges.remove(idx);
            }
            (true, false) => {
                self.ranges[idx - 1] = Range::new(self.ranges[idx - 1].low(), value);
            }
            (false, true) => {
                self.ranges[idx] = Range::new(value, self.ranges[idx].high());
            }
            (false, false) => {
                self.ranges.insert(idx, Range::single(value));
            }
        }
    }

    /// Set union, merging overlapping and adjacent ranges from both sides.
    ///
    /// Linear in the total number of ranges.
    #[must_use]
    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut out: Vec<Range> =
            Vec::with_capacity(self.ranges.len() + other.ranges.len());
        let mut a = self.ranges.iter().peekable();
        let mut b = other.ranges.iter().peekable();
        loop {
            let next = match (a.peek(), b.peek()) {
                (None, None) => break,
                (Some(&&x), None) => {
                    a.next();
                    x
                }
                (None, Some(&&y)) => {
                    b.next();
                    y
                }
                (Some(&&x), Some(&&y)) => {
                    if x.low() <= y.low() {
                        a.next();
                        x
                    } else {
                        b.next();
                        y
                    }
                }
            };
            push_coalescing(&mut out, next);
        }
        RangeSet { ranges: out }
    }

    /// Values in `self` that are not in `other`.
    ///
    /// This is the replication primitive: with `self` as a peer's
    /// descriptor and `other` as the local one, the result is exactly the
    /// identifiers to fetch. Linear in the total number of ranges.
    #[must_use]
    pub fn difference(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        let mut j = 0;
        for &ra in &self.ranges {
            // Subtrahend ranges ending before this range start cannot
            // affect it or any later range.
            while j < other.ranges.len() && other.ranges[j].high() < ra.low() {
                j += 1;
            }
            let mut k = j;
            let mut cursor = Some(ra.low());
            while let Some(low) = cursor {
                match other.ranges.get(k) {
                    Some(rb) if rb.low() <= ra.high() => {
                        if rb.low() > low {
                            out.push(Range::new(low, rb.low() - 1));
                        }
                        if rb.high() >= ra.high() {
                            cursor = None;
                        } else {
                            cursor = Some(rb.high() + 1);
                            k += 1;
                        }
                    }
                    _ => {
                        out.push(Range::new(low, ra.high()));
                        cursor = None;
                    }
                }
            }
        }
        RangeSet { ranges: out }
    }

    /// Values present in both sets. Linear in the total number of ranges.
    #[must_use]
    pub fn intersection(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (ra, rb) = (self.ranges[i], other.ranges[j]);
            let low = ra.low().max(rb.low());
            let high = ra.high().min(rb.high());
            if low <= high {
                out.push(Range::new(low, high));
            }
            if ra.high() <= rb.high() {
                i += 1;
            } else {
                j += 1;
            }
        }
        RangeSet { ranges: out }
    }

    /// Iterates the contained values in ascending order.
    ///
    /// The iterator is lazy; a set like `"1-1000000000"` costs nothing to
    /// build and yields values on demand.
    #[must_use]
    pub fn iter(&self) -> RangeIterator<'_> {
        RangeIterator::new(&self.ranges)
    }
}

/// Appends `next` to a canonical prefix, merging on overlap or adjacency.
fn push_coalescing(out: &mut Vec<Range>, next: Range) {
    if let Some(last) = out.last_mut() {
        // `checked_add` returning `None` means the prefix already ends at
        // `u64::MAX` and everything merges into it.
        let touches = match last.high().checked_add(1) {
            Some(limit) => next.low() <= limit,
            None => true,
        };
        if touches {
            if next.high() > last.high() {
                *last = Range::new(last.low(), next.high());
            }
            return;
        }
    }
    out.push(next);
}

/// Parses a single `n` or `n-m` token.
fn parse_token(token: &str) -> RangeSetResult<Range> {
    match token.split_once('-') {
        None => Ok(Range::single(parse_bound(token, token)?)),
        Some((low, high)) => {
            let low = parse_bound(low, token)?;
            let high = parse_bound(high, token)?;
            if low > high {
                return Err(RangeSetError::DescendingBounds { low, high });
            }
            Ok(Range::new(low, high))
        }
    }
}

/// Parses one bound as a plain decimal `u64` (no sign, no whitespace).
fn parse_bound(text: &str, token: &str) -> RangeSetResult<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeSetError::invalid_token(token));
    }
    text.parse()
        .map_err(|_| RangeSetError::invalid_number(token))
}

impl fmt::Display for RangeSet {
    /// Renders the canonical comma-separated text form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

impl FromStr for RangeSet {
    type Err = RangeSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<u64> for RangeSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

impl Extend<u64> for RangeSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = u64;
    type IntoIter = RangeIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(text: &str) -> RangeSet {
        RangeSet::parse(text).unwrap()
    }

    #[test]
    fn test_empty_round_trip() {
        let s = set("");
        assert!(s.is_empty());
        assert_eq!(s.count(), 0);
        assert_eq!(s.to_string(), "");
        assert_eq!(s.lowest(), None);
        assert_eq!(s.highest(), None);
    }

    #[test]
    fn test_parse_canonical() {
        let s = set("1-5,7,9-12");
        assert_eq!(s.ranges().len(), 3);
        assert_eq!(s.count(), 10);
        assert_eq!(s.lowest(), Some(1));
        assert_eq!(s.highest(), Some(12));
        assert_eq!(s.to_string(), "1-5,7,9-12");
    }

    #[test]
    fn test_parse_degenerate_pair_normalizes() {
        assert_eq!(set("3-3").to_string(), "3");
        assert_eq!(set("1,3-3,5").to_string(), "1,3,5");
    }

    #[test]
    fn test_parse_u64_extremes() {
        let text = "0,18446744073709551614-18446744073709551615";
        let s = set(text);
        assert!(s.contains(0));
        assert!(s.contains(u64::MAX));
        assert_eq!(s.to_string(), text);
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        for text in ["x", "1,", ",1", "1,,2", " 1", "1 ", "+1", "-5", "5-", "1-2-3"] {
            assert!(
                matches!(
                    RangeSet::parse(text),
                    Err(RangeSetError::InvalidToken { .. })
                        | Err(RangeSetError::InvalidNumber { .. })
                ),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(matches!(
            RangeSet::parse("18446744073709551616"),
            Err(RangeSetError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_descending_pair() {
        assert_eq!(
            RangeSet::parse("9-3"),
            Err(RangeSetError::DescendingBounds { low: 9, high: 3 })
        );
    }

    #[test]
    fn test_parse_rejects_non_canonical_order() {
        // Out of order, overlapping, and adjacent tokens are all refused.
        for text in ["7,1-5", "1-5,3", "1-5,5-8", "1-5,6", "2,2"] {
            assert!(
                matches!(RangeSet::parse(text), Err(RangeSetError::OutOfOrder { .. })),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_add_grows_and_merges() {
        let mut s = RangeSet::new();
        s.add(1);
        assert_eq!(s.to_string(), "1");
        s.add(2);
        assert_eq!(s.to_string(), "1-2");
        s.add(3);
        assert_eq!(s.to_string(), "1-3");
        s.add(7);
        assert_eq!(s.to_string(), "1-3,7");
        s.add(5);
        assert_eq!(s.to_string(), "1-3,5,7");
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut s = set("1-5,9");
        s.add(3);
        s.add(9);
        assert_eq!(s.to_string(), "1-5,9");
    }

    #[test]
    fn test_add_bridges_two_ranges() {
        let mut s = set("1-3,5-7");
        s.add(4);
        assert_eq!(s.to_string(), "1-7");
        assert_eq!(s.ranges().len(), 1);
    }

    #[test]
    fn test_add_at_domain_edges() {
        let mut s = RangeSet::new();
        s.add(u64::MAX);
        s.add(u64::MAX - 1);
        s.add(0);
        assert_eq!(
            s.to_string(),
            "0,18446744073709551614-18446744073709551615"
        );
        s.add(u64::MAX);
        assert_eq!(s.ranges().len(), 2);
    }

    #[test]
    fn test_contains() {
        let s = set("1-5,7,9-12");
        for v in [1, 3, 5, 7, 9, 12] {
            assert!(s.contains(v), "missing {v}");
        }
        for v in [0, 6, 8, 13, 100] {
            assert!(!s.contains(v), "unexpected {v}");
        }
    }

    #[test]
    fn test_union_merges_overlap_and_adjacency() {
        assert_eq!(set("1-3").union(&set("5-7")).to_string(), "1-3,5-7");
        assert_eq!(set("1-3").union(&set("4-7")).to_string(), "1-7");
        assert_eq!(set("1-5").union(&set("3-8")).to_string(), "1-8");
        assert_eq!(set("1-10").union(&set("3,5,7")).to_string(), "1-10");
        assert_eq!(set("").union(&set("2,4")).to_string(), "2,4");
    }

    #[test]
    fn test_union_interleaved() {
        let a = set("1,5,9-10");
        let b = set("2-3,6,12");
        assert_eq!(a.union(&b).to_string(), "1-3,5-6,9-10,12");
        assert_eq!(b.union(&a).to_string(), "1-3,5-6,9-10,12");
    }

    #[test]
    fn test_difference() {
        // {1,2,3,5} \ {1,2,4} = {3,5}
        assert_eq!(set("1-3,5").difference(&set("1-2,4")).to_string(), "3,5");
        assert_eq!(set("1-10").difference(&set("3-5")).to_string(), "1-2,6-10");
        assert_eq!(set("1-10").difference(&set("1-10")).to_string(), "");
        assert_eq!(set("1-10").difference(&set("")).to_string(), "1-10");
        assert_eq!(set("").difference(&set("1-10")).to_string(), "");
    }

    #[test]
    fn test_difference_spanning_subtrahend() {
        // One subtrahend range eats into several minuend ranges.
        assert_eq!(
            set("1-3,5-7,9-11").difference(&set("2-10")).to_string(),
            "1,11"
        );
    }

    #[test]
    fn test_difference_as_missing_events() {
        let mine = set("1-5,7");
        let peer = set("1-9");
        assert_eq!(peer.difference(&mine).to_string(), "6,8-9");
    }

    #[test]
    fn test_intersection() {
        assert_eq!(set("1-5").intersection(&set("3-8")).to_string(), "3-5");
        assert_eq!(set("1-3").intersection(&set("5-7")).to_string(), "");
        assert_eq!(
            set("1-10").intersection(&set("2,4,6-20")).to_string(),
            "2,4,6-10"
        );
        assert_eq!(set("").intersection(&set("1-10")).to_string(), "");
    }

    #[test]
    fn test_from_iterator_collects_unsorted_input() {
        let s: RangeSet = [5u64, 1, 2, 9, 3, 2].into_iter().collect();
        assert_eq!(s.to_string(), "1-3,5,9");
    }

    prop_compose! {
        /// A canonical set built by inserting random small values.
        fn arb_range_set()(values in prop::collection::vec(0u64..500, 0..40)) -> RangeSet {
            values.into_iter().collect()
        }
    }

    proptest! {
        #[test]
        fn prop_text_round_trip(s in arb_range_set()) {
            let parsed = RangeSet::parse(&s.to_string()).unwrap();
            prop_assert_eq!(parsed, s);
        }

        #[test]
        fn prop_canonical_invariants(s in arb_range_set()) {
            let ranges = s.ranges();
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].high() < pair[1].low());
                prop_assert!(pair[1].low() - pair[0].high() >= 2);
            }
        }

        #[test]
        fn prop_difference_partitions(a in arb_range_set(), b in arb_range_set()) {
            let only_a = a.difference(&b);
            let only_b = b.difference(&a);
            let both = a.intersection(&b);
            prop_assert_eq!(only_a.intersection(&only_b).to_string(), "");
            prop_assert_eq!(only_a.intersection(&both).to_string(), "");
            prop_assert_eq!(only_b.intersection(&both).to_string(), "");
            prop_assert_eq!(only_a.union(&both), a.clone());
            prop_assert_eq!(only_a.union(&only_b).union(&both), a.union(&b));
        }

        #[test]
        fn prop_union_counts(a in arb_range_set(), b in arb_range_set()) {
            let expected = a.count() + b.count() - a.intersection(&b).count();
            prop_assert_eq!(a.union(&b).count(), expected);
        }

        #[test]
        fn prop_operations_match_naive_sets(a in arb_range_set(), b in arb_range_set()) {
            use std::collections::BTreeSet;
            let na: BTreeSet<u64> = a.iter().collect();
            let nb: BTreeSet<u64> = b.iter().collect();

            let union: Vec<u64> = a.union(&b).iter().collect();
            prop_assert_eq!(union, na.union(&nb).copied().collect::<Vec<_>>());

            let diff: Vec<u64> = a.difference(&b).iter().collect();
            prop_assert_eq!(diff, na.difference(&nb).copied().collect::<Vec<_>>());

            let inter: Vec<u64> = a.intersection(&b).iter().collect();
            prop_assert_eq!(inter, na.intersection(&nb).copied().collect::<Vec<_>>());
        }
    }
}
