//! Error types for repository operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors produced by repositories and backup repositories.
///
/// A failed compare-and-swap is *not* an error: `commit` reports it as
/// `Ok(false)`. The variants here cover genuinely failed operations, which
/// are surfaced to the caller unchanged and never retried internally.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying storage failure, propagated as-is.
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested version is not present in the repository.
    #[error("version {version} not found in repository")]
    NotFound {
        /// The version that was requested.
        version: u64,
    },

    /// A version number outside the valid range was supplied (versions are
    /// 1-based; 0 means "empty repository" and is never storable).
    #[error("invalid repository version {version}")]
    InvalidVersion {
        /// The offending version number.
        version: u64,
    },

    /// Another process holds the repository directory lock.
    #[error("repository directory is locked by another process: {path}")]
    Locked {
        /// The locked directory.
        path: PathBuf,
    },

    /// On-disk state that cannot be interpreted (bad HEAD file, not a
    /// directory, ...).
    #[error("corrupt repository state: {reason}")]
    Corrupt {
        /// Human-readable description of what was found.
        reason: String,
    },

    /// The working copy has local modifications and the caller asked to
    /// fail rather than discard them.
    #[error("working copy has unsaved local changes")]
    DirtyWorkingCopy,
}

impl RepositoryError {
    /// Creates a [`RepositoryError::NotFound`] error.
    #[must_use]
    pub fn not_found(version: u64) -> Self {
        Self::NotFound { version }
    }

    /// Creates a [`RepositoryError::Corrupt`] error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RepositoryError::not_found(7).to_string(),
            "version 7 not found in repository"
        );
        assert_eq!(
            RepositoryError::InvalidVersion { version: 0 }.to_string(),
            "invalid repository version 0"
        );
        assert!(RepositoryError::corrupt("HEAD is not a number")
            .to_string()
            .contains("HEAD is not a number"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: RepositoryError = io.into();
        assert!(matches!(err, RepositoryError::Io(_)));
    }
}
