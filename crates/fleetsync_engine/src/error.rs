//! Error types for the sync engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during synchronization.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Malformed protocol document from the peer.
    #[error("protocol error: {0}")]
    Protocol(#[from] fleetsync_protocol::ProtocolError),

    /// Local or remote log store failure.
    #[error("log store error: {0}")]
    Log(#[from] fleetsync_log::LogError),

    /// Repository failure during versioned replication.
    #[error("repository error: {0}")]
    Repository(#[from] fleetsync_repository::RepositoryError),

    /// Sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// A cycle was requested while one is already running.
    #[error("invalid state transition from {from} to {to}")]
    InvalidState {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// Not connected to the peer.
    #[error("not connected to peer")]
    NotConnected,

    /// Repeated cycles kept transferring events.
    #[error("no fixed point after {rounds} sync rounds")]
    FixedPointNotReached {
        /// Rounds attempted.
        rounds: u32,
    },
}

impl EngineError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// Only transient transport failures qualify. Format errors, missing
    /// data and I/O failures abort the cycle and reach the caller as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
