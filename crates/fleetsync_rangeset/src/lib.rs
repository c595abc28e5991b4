//! Compact integer range-set algebra for Fleetsync.
//!
//! A [`RangeSet`] stores a set of `u64` values as sorted, non-overlapping,
//! non-adjacent inclusive [`Range`]s, so that the dense identifier sequences
//! produced by append-only logs compress to a handful of ranges. Sets render
//! to and parse from a canonical text form (`"1-5,7,9-12"`) that is embedded
//! verbatim in replication descriptors, which keeps the wire encoding a
//! comparison-friendly string rather than a binary structure.
//!
//! The three set operations ([`RangeSet::union`], [`RangeSet::difference`],
//! [`RangeSet::intersection`]) run as linear merges over the range lists, so
//! computing "events the peer has that I lack" costs `O(|a| + |b|)` ranges
//! regardless of how many integers the sets contain.
//!
//! # Example
//!
//! ```
//! use fleetsync_rangeset::RangeSet;
//!
//! let mine: RangeSet = "1-5,7".parse()?;
//! let peer: RangeSet = "1-9".parse()?;
//!
//! let missing = peer.difference(&mine);
//! assert_eq!(missing.to_string(), "6,8-9");
//! assert_eq!(missing.iter().collect::<Vec<_>>(), vec![6, 8, 9]);
//! # Ok::<(), fleetsync_rangeset::RangeSetError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod iter;
mod range;
mod set;

pub use error::{RangeSetError, RangeSetResult};
pub use iter::RangeIterator;
pub use range::Range;
pub use set::RangeSet;
