//! Error types for the provisioning server.

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while handling provisioning requests.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format or size.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No repository is wired under the requested name.
    #[error("unknown repository: {name:?}")]
    UnknownRepository {
        /// The name the request addressed.
        name: String,
    },

    /// Log store failure.
    #[error("log store error: {0}")]
    Log(#[from] fleetsync_log::LogError),

    /// Repository failure.
    #[error("repository error: {0}")]
    Repository(#[from] fleetsync_repository::RepositoryError),

    /// Deployment package failure.
    #[error("deployment error: {0}")]
    Deploy(#[from] fleetsync_deploy::DeployError),
}

impl ServerError {
    /// Returns true if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        use fleetsync_deploy::DeployError;
        use fleetsync_repository::RepositoryError;
        match self {
            ServerError::InvalidRequest(_) | ServerError::UnknownRepository { .. } => true,
            ServerError::Repository(
                RepositoryError::NotFound { .. } | RepositoryError::InvalidVersion { .. },
            ) => true,
            ServerError::Deploy(DeployError::UnknownVersion { .. }) => true,
            _ => false,
        }
    }

    /// Returns true if the caller should back off and repeat the request.
    ///
    /// Only deployment stream backpressure qualifies; every other failure
    /// is either the client's fault or a real server-side problem.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Deploy(e) if e.is_retryable())
    }
}
