//! Replication protocol documents for Fleetsync.
//!
//! The protocol is symmetric and runs over any request/response transport:
//!
//! 1. **Query** — ask the peer which event logs it holds and, per log, the
//!    [`RangeSet`](fleetsync_rangeset::RangeSet) of event ids it has. The
//!    answer is a document of [`LogDescriptor`] lines.
//! 2. **Plan** — [`delta`] compares the peer's descriptors with the local
//!    ones; the difference is exactly the set of events worth transferring.
//! 3. **Transfer** — fetch missing events with a [`ReceiveRequest`]
//!    (answered by an [`EventBatch`]), or push local ones as an
//!    [`EventBatch`] (answered by a [`SendResponse`] counting idempotent
//!    duplicates).
//!
//! Everything here is pure data and text codecs; no I/O. Both documents are
//! line-oriented: one descriptor or one escaped event per line, so a
//! transfer aborted mid-document loses nothing but the tail lines.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod descriptor;
mod error;
mod messages;

pub use delta::delta;
pub use descriptor::LogDescriptor;
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{EventBatch, QueryRequest, QueryResponse, ReceiveRequest, SendResponse};
