//! Server configuration.

/// Configuration for the provisioning server.
///
/// Settings cover the server role only; how requests arrive (HTTP,
/// message bus, in-process calls) is the embedding application's concern.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum events returned in one receive answer.
    pub max_receive_batch: usize,
    /// Maximum events accepted in one pushed batch.
    pub max_send_batch: usize,
    /// Maximum deployment package streams open at once.
    pub max_package_streams: usize,
}

impl ServerConfig {
    /// Creates a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_receive_batch: 1000,
            max_send_batch: 1000,
            max_package_streams: 8,
        }
    }

    /// Sets the maximum receive answer size.
    #[must_use]
    pub fn with_max_receive_batch(mut self, size: usize) -> Self {
        self.max_receive_batch = size;
        self
    }

    /// Sets the maximum accepted push size.
    #[must_use]
    pub fn with_max_send_batch(mut self, size: usize) -> Self {
        self.max_send_batch = size;
        self
    }

    /// Sets the package stream limit.
    #[must_use]
    pub fn with_max_package_streams(mut self, limit: usize) -> Self {
        self.max_package_streams = limit;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
