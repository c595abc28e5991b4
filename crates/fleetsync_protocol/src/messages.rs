//! Request and response types of the replication exchange.

use crate::descriptor::LogDescriptor;
use crate::error::{ProtocolError, ProtocolResult};
use fleetsync_log::{decode_event, encode_event, LogEvent};
use fleetsync_rangeset::RangeSet;

/// Asks a peer to describe the logs it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryRequest {
    /// Restrict the answer to one log; `None` describes all of them.
    pub log_id: Option<u64>,
}

impl QueryRequest {
    /// Queries every log the peer holds.
    #[must_use]
    pub fn all() -> Self {
        Self { log_id: None }
    }

    /// Queries a single log.
    #[must_use]
    pub fn for_log(log_id: u64) -> Self {
        Self {
            log_id: Some(log_id),
        }
    }
}

/// Answer to a [`QueryRequest`]: one descriptor per held log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResponse {
    /// Descriptors, ascending by log id.
    pub descriptors: Vec<LogDescriptor>,
}

impl QueryResponse {
    /// Wraps a descriptor list.
    #[must_use]
    pub fn new(descriptors: Vec<LogDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Renders as a descriptor-lines document.
    #[must_use]
    pub fn to_document(&self) -> String {
        LogDescriptor::render_document(&self.descriptors)
    }

    /// Parses a descriptor-lines document.
    ///
    /// # Errors
    ///
    /// [`ProtocolError`] on the first malformed line.
    pub fn parse_document(text: &str) -> ProtocolResult<Self> {
        Ok(Self::new(LogDescriptor::parse_document(text)?))
    }
}

/// Asks a peer for events of one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// The log to read.
    pub log_id: u64,
    /// Which event ids to send; `None` means everything held.
    pub ranges: Option<RangeSet>,
}

impl ReceiveRequest {
    /// Requests every event of a log.
    #[must_use]
    pub fn all(log_id: u64) -> Self {
        Self {
            log_id,
            ranges: None,
        }
    }

    /// Requests exactly the given event ids — normally the output of
    /// [`delta`](crate::delta).
    #[must_use]
    pub fn for_ranges(log_id: u64, ranges: RangeSet) -> Self {
        Self {
            log_id,
            ranges: Some(ranges),
        }
    }
}

/// An ordered batch of events: the payload of both transfer directions.
///
/// The wire form is an event-lines document, one escaped event per line,
/// so a batch can be streamed and an aborted transfer loses only tail
/// lines — never a partial event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventBatch {
    /// The events, in transfer order.
    pub events: Vec<LogEvent>,
}

impl EventBatch {
    /// Wraps an event list.
    #[must_use]
    pub fn new(events: Vec<LogEvent>) -> Self {
        Self { events }
    }

    /// Number of events in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch carries no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Renders as an event-lines document.
    #[must_use]
    pub fn to_document(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&encode_event(event));
            out.push('\n');
        }
        out
    }

    /// Parses an event-lines document; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Event`] on the first malformed line.
    pub fn parse_document(text: &str) -> ProtocolResult<Self> {
        let events = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| decode_event(line).map_err(ProtocolError::from))
            .collect::<ProtocolResult<Vec<LogEvent>>>()?;
        Ok(Self::new(events))
    }
}

/// Answer to a pushed [`EventBatch`].
///
/// `ignored` counts idempotent duplicates — events the peer already held.
/// A fully ignored batch is the normal steady state of a repeated push,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendResponse {
    /// Events newly applied by the peer.
    pub accepted: u64,
    /// Events the peer already held.
    pub ignored: u64,
}

impl SendResponse {
    /// Pairs the applied/duplicate counts.
    #[must_use]
    pub fn new(accepted: u64, ignored: u64) -> Self {
        Self { accepted, ignored }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsync_log::{EventProperties, EventType};

    fn event(log_id: u64, event_id: u64) -> LogEvent {
        LogEvent::new(
            log_id,
            event_id,
            EventType::BUNDLE_INSTALLED,
            1000 + event_id,
            EventProperties::new().with("symbolicName", "com.acme,web"),
        )
    }

    #[test]
    fn test_query_request_constructors() {
        assert_eq!(QueryRequest::all().log_id, None);
        assert_eq!(QueryRequest::for_log(7).log_id, Some(7));
    }

    #[test]
    fn test_query_response_document_round_trip() {
        let response = QueryResponse::new(vec![
            LogDescriptor::new(1, RangeSet::parse("1-4").unwrap()),
            LogDescriptor::empty(2),
        ]);
        let document = response.to_document();
        assert_eq!(QueryResponse::parse_document(&document).unwrap(), response);
    }

    #[test]
    fn test_event_batch_document_round_trip() {
        let batch = EventBatch::new(vec![event(1, 1), event(1, 2), event(9, 5)]);
        let document = batch.to_document();
        assert_eq!(document.lines().count(), 3);
        assert_eq!(EventBatch::parse_document(&document).unwrap(), batch);
    }

    #[test]
    fn test_event_batch_empty_document() {
        assert!(EventBatch::parse_document("").unwrap().is_empty());
        assert_eq!(EventBatch::default().to_document(), "");
    }

    #[test]
    fn test_event_batch_rejects_bad_lines() {
        assert!(matches!(
            EventBatch::parse_document("1,1,1001,5\nbroken line\n"),
            Err(ProtocolError::Event(_))
        ));
    }

    #[test]
    fn test_receive_request_constructors() {
        assert_eq!(ReceiveRequest::all(3).ranges, None);
        let req = ReceiveRequest::for_ranges(3, RangeSet::parse("4,6").unwrap());
        assert_eq!(req.ranges.as_ref().map(ToString::to_string), Some("4,6".into()));
    }
}
