//! Transport layer abstraction for log replication.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};
use fleetsync_log::LogStore;
use fleetsync_protocol::{
    EventBatch, LogDescriptor, QueryRequest, QueryResponse, ReceiveRequest, SendResponse,
};

/// A log transport carries the three replication commands to a peer.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process loopback, mock for testing, etc.).
pub trait LogTransport: Send + Sync {
    /// Asks the peer to describe the logs it holds.
    ///
    /// # Errors
    ///
    /// Transport failures, or a malformed answer from the peer.
    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResponse>;

    /// Fetches events of one log from the peer.
    ///
    /// # Errors
    ///
    /// Transport failures, or a malformed answer from the peer.
    fn receive(&self, request: &ReceiveRequest) -> EngineResult<EventBatch>;

    /// Delivers a batch of events to the peer.
    ///
    /// # Errors
    ///
    /// Transport failures, or a malformed answer from the peer.
    fn send(&self, batch: &EventBatch) -> EngineResult<SendResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    ///
    /// # Errors
    ///
    /// Transport failures while shutting down.
    fn close(&self) -> EngineResult<()>;
}

/// A mock transport for testing, answering with canned responses.
#[derive(Default)]
pub struct MockTransport {
    connected: AtomicBool,
    query_response: Mutex<Option<QueryResponse>>,
    receive_response: Mutex<Option<EventBatch>>,
    send_response: Mutex<Option<SendResponse>>,
}

impl MockTransport {
    /// Creates a new mock transport, initially connected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            query_response: Mutex::new(None),
            receive_response: Mutex::new(None),
            send_response: Mutex::new(None),
        }
    }

    /// Sets the query response.
    pub fn set_query_response(&self, response: QueryResponse) {
        *self.query_response.lock() = Some(response);
    }

    /// Sets the receive response.
    pub fn set_receive_response(&self, response: EventBatch) {
        *self.receive_response.lock() = Some(response);
    }

    /// Sets the send response.
    pub fn set_send_response(&self, response: SendResponse) {
        *self.send_response.lock() = Some(response);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl LogTransport for MockTransport {
    fn query(&self, _request: &QueryRequest) -> EngineResult<QueryResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.query_response
            .lock()
            .clone()
            .ok_or_else(|| EngineError::transport_fatal("no mock query response set"))
    }

    fn receive(&self, _request: &ReceiveRequest) -> EngineResult<EventBatch> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.receive_response
            .lock()
            .clone()
            .ok_or_else(|| EngineError::transport_fatal("no mock receive response set"))
    }

    fn send(&self, _batch: &EventBatch) -> EngineResult<SendResponse> {
        if !self.is_connected() {
            return Err(EngineError::NotConnected);
        }
        self.send_response
            .lock()
            .clone()
            .ok_or_else(|| EngineError::transport_fatal("no mock send response set"))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> EngineResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// An in-process peer: serves the replication commands straight from a
/// [`LogStore`].
///
/// Used by tests and by embedded deployments where both sides live in one
/// process. Serving is lenient the way a remote peer is: asking about a
/// log the store does not hold yields an empty answer, not an error.
pub struct LoopbackTransport {
    store: Arc<dyn LogStore>,
}

impl LoopbackTransport {
    /// Creates a loopback peer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    fn descriptor(&self, log_id: u64) -> EngineResult<LogDescriptor> {
        Ok(LogDescriptor::new(log_id, self.store.id_range(log_id)?))
    }
}

impl LogTransport for LoopbackTransport {
    fn query(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
        let descriptors = match request.log_id {
            Some(log_id) => vec![self.descriptor(log_id)?],
            None => {
                let mut descriptors = Vec::new();
                for log_id in self.store.log_ids()? {
                    descriptors.push(self.descriptor(log_id)?);
                }
                descriptors
            }
        };
        Ok(QueryResponse::new(descriptors))
    }

    fn receive(&self, request: &ReceiveRequest) -> EngineResult<EventBatch> {
        let held = self.store.id_range(request.log_id)?;
        let wanted = match &request.ranges {
            Some(ranges) => ranges.intersection(&held),
            None => held,
        };
        let mut events = Vec::new();
        for range in wanted.ranges() {
            events.extend(
                self.store
                    .events_in(request.log_id, range.low(), range.high())?,
            );
        }
        Ok(EventBatch::new(events))
    }

    fn send(&self, batch: &EventBatch) -> EngineResult<SendResponse> {
        let mut accepted = 0u64;
        let mut ignored = 0u64;
        for event in &batch.events {
            if self.store.insert(event)? {
                accepted += 1;
            } else {
                ignored += 1;
            }
        }
        Ok(SendResponse::new(accepted, ignored))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn close(&self) -> EngineResult<()> {
        Ok(())
    }
}
