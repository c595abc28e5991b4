//! Error types for deployment package generation.

use thiserror::Error;

/// Result alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors produced while diffing snapshots and streaming packages.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Too many package streams in flight; back off and retry.
    ///
    /// This is transient backpressure, never a permanent failure, so
    /// [`is_retryable`](DeployError::is_retryable) is `true`.
    #[error("deployment stream limit reached ({active} of {limit} active)")]
    Overloaded {
        /// Streams currently open.
        active: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// An artifact named by the snapshot has no content in the source.
    #[error("artifact content missing from source: {filename}")]
    MissingArtifact {
        /// Filename of the absent artifact.
        filename: String,
    },

    /// The requested snapshot version does not exist for the target.
    #[error("unknown deployment version {version:?} for target {target:?}")]
    UnknownVersion {
        /// The device/target the snapshot was requested for.
        target: String,
        /// The version that was requested.
        version: String,
    },

    /// Underlying storage failure in an artifact source.
    #[error("deployment I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Whether the caller should delay and retry (only
    /// [`DeployError::Overloaded`] qualifies).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Overloaded { .. })
    }
}
