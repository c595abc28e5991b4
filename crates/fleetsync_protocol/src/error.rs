//! Error types for protocol document parsing.

use thiserror::Error;

/// Result alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced when parsing protocol documents.
///
/// All of these surface at a parse boundary, leave no partial state behind,
/// and abort the current sync cycle rather than being retried.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A structurally malformed document or line.
    #[error("malformed protocol document: {reason}")]
    Format {
        /// What was wrong.
        reason: String,
    },

    /// A descriptor carried an invalid range set.
    #[error("invalid range set in descriptor: {0}")]
    RangeSet(#[from] fleetsync_rangeset::RangeSetError),

    /// An event line failed to decode.
    #[error("invalid event record: {0}")]
    Event(#[from] fleetsync_log::LogError),
}

impl ProtocolError {
    /// Creates a [`ProtocolError::Format`] error.
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }
}
