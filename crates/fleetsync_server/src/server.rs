//! Provisioning server composition root.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use fleetsync_deploy::{ArtifactSource, PackageStream, SnapshotProvider};
use fleetsync_log::LogStore;
use fleetsync_protocol::{EventBatch, QueryRequest, QueryResponse, ReceiveRequest, SendResponse};
use fleetsync_rangeset::RangeSet;
use fleetsync_repository::Repository;

/// The provisioning server.
///
/// Answers log replication, repository and deployment commands for any
/// number of remote peers. All collaborators are wired at construction and
/// fixed for the server's lifetime; a network frontend only has to map its
/// endpoints onto the `handle_*` methods.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fleetsync_deploy::{MemoryArtifactSource, MemorySnapshotProvider};
/// use fleetsync_log::MemoryLogStore;
/// use fleetsync_repository::MemoryRepository;
/// use fleetsync_server::{ProvisioningServer, ServerConfig};
///
/// let server = ProvisioningServer::new(
///     ServerConfig::default(),
///     Arc::new(MemoryLogStore::new()),
///     [(
///         "shop".to_string(),
///         Arc::new(MemoryRepository::new()) as Arc<dyn fleetsync_repository::Repository>,
///     )],
///     Arc::new(MemorySnapshotProvider::new()),
///     Arc::new(MemoryArtifactSource::new()),
/// );
///
/// assert!(server.handle_commit("shop", b"state", 0).unwrap());
/// ```
pub struct ProvisioningServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl ProvisioningServer {
    /// Creates a new provisioning server over explicit collaborators.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn LogStore>,
        repositories: impl IntoIterator<Item = (String, Arc<dyn Repository>)>,
        provider: Arc<dyn SnapshotProvider>,
        source: Arc<dyn ArtifactSource>,
    ) -> Self {
        let context = Arc::new(HandlerContext::new(
            config,
            store,
            repositories,
            provider,
            source,
        ));
        Self::with_context(context)
    }

    /// Creates a provisioning server over an existing handler context.
    pub fn with_context(context: Arc<HandlerContext>) -> Self {
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Handles a query request.
    ///
    /// # Errors
    ///
    /// Store failures while describing the held logs.
    pub fn handle_query(&self, request: &QueryRequest) -> ServerResult<QueryResponse> {
        self.handler.handle_query(request)
    }

    /// Handles a receive request.
    ///
    /// # Errors
    ///
    /// Store failures while reading the requested events.
    pub fn handle_receive(&self, request: &ReceiveRequest) -> ServerResult<EventBatch> {
        self.handler.handle_receive(request)
    }

    /// Handles a batch of pushed events.
    ///
    /// # Errors
    ///
    /// An oversized batch, or store failures while applying it.
    pub fn handle_send(&self, batch: &EventBatch) -> ServerResult<SendResponse> {
        self.handler.handle_send(batch)
    }

    /// The version set of a named repository.
    ///
    /// # Errors
    ///
    /// An unknown repository name, or repository failures.
    pub fn handle_repository_range(&self, name: &str) -> ServerResult<RangeSet> {
        self.handler.handle_repository_range(name)
    }

    /// Checks out one version of a named repository.
    ///
    /// # Errors
    ///
    /// An unknown repository name, a version the repository does not hold,
    /// or repository failures.
    pub fn handle_checkout(&self, name: &str, version: u64) -> ServerResult<Vec<u8>> {
        self.handler.handle_checkout(name, version)
    }

    /// Commits against a named repository.
    ///
    /// Returns the compare-and-set verdict: `false` means the caller's
    /// `from_version` was stale and nothing changed.
    ///
    /// # Errors
    ///
    /// An unknown repository name, an impossible `from_version`, or
    /// repository failures. A lost race is `Ok(false)`, never an error.
    pub fn handle_commit(&self, name: &str, data: &[u8], from_version: u64) -> ServerResult<bool> {
        self.handler.handle_commit(name, data, from_version)
    }

    /// Deployment snapshot versions known for a target.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub fn handle_deployment_versions(&self, target: &str) -> ServerResult<Vec<String>> {
        self.handler.handle_deployment_versions(target)
    }

    /// Builds a deployment package stream for a target.
    ///
    /// # Errors
    ///
    /// Unknown target versions, or a retryable overload error when too many
    /// streams are already in flight.
    pub fn handle_deployment_package(
        &self,
        target: &str,
        to: &str,
        fix_from: Option<&str>,
    ) -> ServerResult<PackageStream> {
        self.handler.handle_deployment_package(target, to, fix_from)
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Names of the repositories this server fronts, ascending.
    pub fn repository_names(&self) -> Vec<String> {
        self.context.repository_names()
    }

    /// Ids of the event logs this server currently holds, ascending.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn log_ids(&self) -> ServerResult<Vec<u64>> {
        Ok(self.context.store.log_ids()?)
    }
}
