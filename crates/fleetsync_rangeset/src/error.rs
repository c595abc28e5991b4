//! Error types for range-set parsing.

use thiserror::Error;

/// Result alias for range-set operations.
pub type RangeSetResult<T> = Result<T, RangeSetError>;

/// Errors produced when parsing the canonical range-set text form.
///
/// Parsing is strict: the input must already be canonical (ascending,
/// non-overlapping, non-adjacent tokens), so a parse–render round trip
/// reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeSetError {
    /// A token was empty or contained characters outside `0-9` and `-`.
    #[error("invalid range token {token:?}")]
    InvalidToken {
        /// The offending token.
        token: String,
    },

    /// A bound was not a valid decimal `u64`.
    #[error("invalid number in range token {token:?}")]
    InvalidNumber {
        /// The token containing the bad number.
        token: String,
    },

    /// A `n-m` token had `m < n`.
    #[error("descending range bounds {low}-{high}")]
    DescendingBounds {
        /// Lower bound as written.
        low: u64,
        /// Upper bound as written.
        high: u64,
    },

    /// A token started at or before the previous token's end, or was
    /// adjacent to it (canonical form requires a gap of at least one).
    #[error("range token {token:?} out of order with the preceding token")]
    OutOfOrder {
        /// The offending token.
        token: String,
    },
}

impl RangeSetError {
    /// Creates an [`RangeSetError::InvalidToken`] error.
    pub fn invalid_token(token: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.into(),
        }
    }

    /// Creates an [`RangeSetError::InvalidNumber`] error.
    pub fn invalid_number(token: impl Into<String>) -> Self {
        Self::InvalidNumber {
            token: token.into(),
        }
    }

    /// Creates an [`RangeSetError::OutOfOrder`] error.
    pub fn out_of_order(token: impl Into<String>) -> Self {
        Self::OutOfOrder {
            token: token.into(),
        }
    }
}
