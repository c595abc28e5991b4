//! Integration tests for the sync engine against a provisioning server.

use std::sync::Arc;

use fleetsync_deploy::{MemoryArtifactSource, MemorySnapshotProvider};
use fleetsync_engine::{
    EngineError, EngineResult, LogSync, LogTransport, SyncConfig, SyncDirection,
};
use fleetsync_log::{LogStore, MemoryLogStore};
use fleetsync_protocol::{EventBatch, QueryRequest, QueryResponse, ReceiveRequest, SendResponse};
use fleetsync_repository::Repository;
use fleetsync_server::{ProvisioningServer, ServerConfig, ServerError};
use fleetsync_testkit::{replicated_event, scenarios};

/// A transport that calls an in-process provisioning server directly.
struct ServerTransport {
    server: Arc<ProvisioningServer>,
}

impl ServerTransport {
    fn new(server: Arc<ProvisioningServer>) -> Self {
        Self { server }
    }
}

fn transport_error(error: ServerError) -> EngineError {
    if error.is_retryable() {
        EngineError::transport_retryable(error.to_string())
    } else {
        EngineError::transport_fatal(error.to_string())
    }
}

impl LogTransport for ServerTransport {
    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        self.server.handle_query(request).map_err(transport_error)
    }

    fn receive(&self, request: &ReceiveRequest) -> EngineResult<EventBatch> {
        self.server.handle_receive(request).map_err(transport_error)
    }

    fn send(&self, batch: &EventBatch) -> EngineResult<SendResponse> {
        self.server.handle_send(batch).map_err(transport_error)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) -> EngineResult<()> {
        Ok(())
    }
}

fn memory_server(config: ServerConfig, store: Arc<MemoryLogStore>) -> Arc<ProvisioningServer> {
    Arc::new(ProvisioningServer::new(
        config,
        store,
        Vec::<(String, Arc<dyn Repository>)>::new(),
        Arc::new(MemorySnapshotProvider::new()),
        Arc::new(MemoryArtifactSource::new()),
    ))
}

#[test]
fn client_server_full_sync() {
    // Local store holds three audit events the server has never seen.
    let local = scenarios::seeded_memory_store(&[(7, &[1, 2, 3])]);
    let server = memory_server(ServerConfig::default(), Arc::new(MemoryLogStore::new()));

    let engine = LogSync::new(
        SyncConfig::default(),
        ServerTransport::new(Arc::clone(&server)),
        Arc::clone(&local) as Arc<dyn LogStore>,
    );

    let result = engine.sync().unwrap();
    assert!(result.success);
    assert_eq!(result.pushed, 3);
    assert_eq!(result.pulled, 0);

    // The server now answers queries with the pushed range.
    let response = server.handle_query(&QueryRequest::all()).unwrap();
    assert_eq!(response.descriptors.len(), 1);
    assert_eq!(response.descriptors[0].log_id, 7);
    assert_eq!(response.descriptors[0].ranges.to_string(), "1-3");
}

#[test]
fn bidirectional_sync() {
    let server = memory_server(ServerConfig::default(), Arc::new(MemoryLogStore::new()));

    // Another gateway pushed its log to the server earlier.
    server
        .handle_send(&EventBatch::new(vec![
            replicated_event(9, 1),
            replicated_event(9, 2),
        ]))
        .unwrap();

    // Our store carries one local event the server has not seen.
    let local = scenarios::seeded_memory_store(&[(3, &[1])]);
    let engine = LogSync::new(
        SyncConfig::default(),
        ServerTransport::new(Arc::clone(&server)),
        Arc::clone(&local) as Arc<dyn LogStore>,
    );

    let result = engine.sync().unwrap();
    assert!(result.success);
    assert_eq!(result.pulled, 2);
    assert_eq!(result.pushed, 1);

    // Both sides now hold both logs.
    assert_eq!(local.id_range(9).unwrap().to_string(), "1-2");
    let response = server.handle_query(&QueryRequest::for_log(3)).unwrap();
    assert_eq!(response.descriptors[0].ranges.to_string(), "1");

    // A second cycle finds nothing left to move.
    assert!(engine.sync().unwrap().is_fixed_point());
}

#[test]
fn empty_sync() {
    let server = memory_server(ServerConfig::default(), Arc::new(MemoryLogStore::new()));
    let engine = LogSync::new(
        SyncConfig::default(),
        ServerTransport::new(server),
        Arc::new(MemoryLogStore::new()),
    );

    let result = engine.sync().unwrap();
    assert!(result.success);
    assert!(result.is_fixed_point());
    assert_eq!(result.ignored, 0);
}

#[test]
fn diverged_logs_converge() {
    let (local, remote) = scenarios::diverged_pair();
    let server = memory_server(ServerConfig::default(), Arc::clone(&remote));

    let engine = LogSync::new(
        SyncConfig::default(),
        ServerTransport::new(server),
        Arc::clone(&local) as Arc<dyn LogStore>,
    );

    let result = engine.sync_to_fixed_point().unwrap();
    assert!(result.success);
    assert_eq!(result.pulled, 1);
    assert_eq!(result.pushed, 2);

    assert_eq!(local.id_range(1).unwrap().to_string(), "1-5");
    assert_eq!(remote.id_range(1).unwrap().to_string(), "1-5");
}

#[test]
fn capped_server_batches_converge_over_rounds() {
    let ids: Vec<u64> = (1..=10).collect();
    let server_store = scenarios::seeded_memory_store(&[(5, ids.as_slice())]);
    let server = memory_server(
        ServerConfig::default().with_max_receive_batch(2),
        server_store,
    );

    let local = Arc::new(MemoryLogStore::new());
    let engine = LogSync::new(
        SyncConfig::new(SyncDirection::Pull),
        ServerTransport::new(server),
        Arc::clone(&local) as Arc<dyn LogStore>,
    );

    // Each cycle the server answers at most two events; replanning from
    // fresh descriptors picks up where the previous cycle was cut short.
    let result = engine.sync_to_fixed_point().unwrap();
    assert_eq!(result.pulled, 10);
    assert_eq!(local.id_range(5).unwrap().to_string(), "1-10");
}

#[test]
fn oversized_push_is_a_fatal_transport_error() {
    let server = memory_server(
        ServerConfig::default().with_max_send_batch(2),
        Arc::new(MemoryLogStore::new()),
    );

    let local = scenarios::seeded_memory_store(&[(2, &[1, 2, 3])]);
    let engine = LogSync::new(
        SyncConfig::default(),
        ServerTransport::new(server),
        Arc::clone(&local) as Arc<dyn LogStore>,
    );

    // The engine offers all three in one batch; the server rejects it and
    // the rejection is not worth retrying.
    let err = engine.sync().unwrap_err();
    assert!(!err.is_retryable());
}
