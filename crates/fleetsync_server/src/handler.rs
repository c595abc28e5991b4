//! Request handlers for provisioning commands.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use fleetsync_deploy::{ArtifactSource, DiffConfig, DiffEngine, PackageStream, SnapshotProvider};
use fleetsync_log::LogStore;
use fleetsync_protocol::{
    EventBatch, LogDescriptor, QueryRequest, QueryResponse, ReceiveRequest, SendResponse,
};
use fleetsync_rangeset::RangeSet;
use fleetsync_repository::Repository;

/// Context for request handling.
///
/// Every collaborator is wired at construction; the set of named
/// repositories in particular is fixed for the server's lifetime.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Event log store served to replicating peers.
    pub store: Arc<dyn LogStore>,
    repositories: HashMap<String, Arc<dyn Repository>>,
    provider: Arc<dyn SnapshotProvider>,
    source: Arc<dyn ArtifactSource>,
    engine: DiffEngine,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn LogStore>,
        repositories: impl IntoIterator<Item = (String, Arc<dyn Repository>)>,
        provider: Arc<dyn SnapshotProvider>,
        source: Arc<dyn ArtifactSource>,
    ) -> Self {
        let engine =
            DiffEngine::new(DiffConfig::default().with_max_concurrent(config.max_package_streams));
        Self {
            config,
            store,
            repositories: repositories.into_iter().collect(),
            provider,
            source,
            engine,
        }
    }

    /// Names of the wired repositories, ascending.
    pub fn repository_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.repositories.keys().cloned().collect();
        names.sort();
        names
    }

    fn repository(&self, name: &str) -> ServerResult<&Arc<dyn Repository>> {
        self.repositories
            .get(name)
            .ok_or_else(|| ServerError::UnknownRepository {
                name: name.to_string(),
            })
    }
}

/// Handler for provisioning requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a query request: descriptors of the logs this server holds.
    ///
    /// Asking about one specific log is lenient; a log the server has
    /// never seen is described as empty.
    pub fn handle_query(&self, request: &QueryRequest) -> ServerResult<QueryResponse> {
        let descriptors = match request.log_id {
            Some(log_id) => vec![self.descriptor(log_id)?],
            None => {
                let mut descriptors = Vec::new();
                for log_id in self.context.store.log_ids()? {
                    descriptors.push(self.descriptor(log_id)?);
                }
                descriptors
            }
        };
        Ok(QueryResponse::new(descriptors))
    }

    /// Handles a receive request: the requested event ids restricted to
    /// what the server actually holds.
    ///
    /// The answer carries at most `max_receive_batch` events; a requester
    /// whose plan was cut short sees the remainder as still missing and
    /// fetches it on its next pass.
    pub fn handle_receive(&self, request: &ReceiveRequest) -> ServerResult<EventBatch> {
        let held = self.context.store.id_range(request.log_id)?;
        let wanted = match &request.ranges {
            Some(ranges) => ranges.intersection(&held),
            None => held,
        };

        let limit = self.context.config.max_receive_batch;
        let mut events = Vec::new();
        for range in wanted.ranges() {
            if events.len() >= limit {
                break;
            }
            events.extend(self.context.store.events_in(
                request.log_id,
                range.low(),
                range.high(),
            )?);
        }
        events.truncate(limit);
        Ok(EventBatch::new(events))
    }

    /// Handles pushed events: applies each one idempotently and reports
    /// how many were new.
    ///
    /// An oversized batch is rejected before anything is applied.
    pub fn handle_send(&self, batch: &EventBatch) -> ServerResult<SendResponse> {
        if batch.len() > self.context.config.max_send_batch {
            return Err(ServerError::InvalidRequest(format!(
                "batch of {} events exceeds limit of {}",
                batch.len(),
                self.context.config.max_send_batch
            )));
        }

        let mut accepted = 0u64;
        let mut ignored = 0u64;
        for event in &batch.events {
            if self.context.store.insert(event)? {
                accepted += 1;
            } else {
                ignored += 1;
            }
        }
        debug!(accepted, ignored, "applied pushed events");
        Ok(SendResponse::new(accepted, ignored))
    }

    /// The version set of a named repository.
    pub fn handle_repository_range(&self, name: &str) -> ServerResult<RangeSet> {
        Ok(self.context.repository(name)?.get_range()?)
    }

    /// Checks out one version of a named repository.
    pub fn handle_checkout(&self, name: &str, version: u64) -> ServerResult<Vec<u8>> {
        Ok(self.context.repository(name)?.checkout(version)?)
    }

    /// Commits against a named repository; the compare-and-set verdict
    /// passes straight through.
    pub fn handle_commit(&self, name: &str, data: &[u8], from_version: u64) -> ServerResult<bool> {
        Ok(self.context.repository(name)?.commit(data, from_version)?)
    }

    /// Deployment snapshot versions known for a target.
    pub fn handle_deployment_versions(&self, target: &str) -> ServerResult<Vec<String>> {
        Ok(self.context.provider.versions(target)?)
    }

    /// Builds a deployment package stream for a target.
    ///
    /// With `fix_from` the package upgrades that installed version;
    /// without it the package installs `to` from scratch. Stream
    /// backpressure surfaces as a retryable error.
    pub fn handle_deployment_package(
        &self,
        target: &str,
        to: &str,
        fix_from: Option<&str>,
    ) -> ServerResult<PackageStream> {
        let to_snapshot = self.context.provider.snapshot(target, to)?;
        let stream = match fix_from {
            Some(from) => {
                let from_snapshot = self.context.provider.snapshot(target, from)?;
                self.context.engine.fix_package(
                    &from_snapshot,
                    &to_snapshot,
                    Arc::clone(&self.context.source),
                )?
            }
            None => self
                .context
                .engine
                .full_package(&to_snapshot, Arc::clone(&self.context.source))?,
        };
        debug!(target, to, fix = stream.is_fix(), "built deployment package");
        Ok(stream)
    }

    fn descriptor(&self, log_id: u64) -> ServerResult<LogDescriptor> {
        Ok(LogDescriptor::new(
            log_id,
            self.context.store.id_range(log_id)?,
        ))
    }
}
