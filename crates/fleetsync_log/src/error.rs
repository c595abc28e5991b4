//! Error types for log stores.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors produced by log stores and the event line codec.
#[derive(Debug, Error)]
pub enum LogError {
    /// Underlying storage failure, propagated as-is.
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has never seen this log.
    #[error("unknown log {log_id}")]
    UnknownLog {
        /// The requested log id.
        log_id: u64,
    },

    /// A malformed event line or escape sequence.
    #[error("malformed log record: {reason}")]
    Format {
        /// What was wrong with the record.
        reason: String,
    },

    /// Another process holds the store directory lock.
    #[error("log store directory is locked by another process: {path}")]
    Locked {
        /// The locked directory.
        path: PathBuf,
    },
}

impl LogError {
    /// Creates a [`LogError::UnknownLog`] error.
    #[must_use]
    pub fn unknown_log(log_id: u64) -> Self {
        Self::UnknownLog { log_id }
    }

    /// Creates a [`LogError::Format`] error.
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }
}
