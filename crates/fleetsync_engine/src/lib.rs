//! # Fleetsync Engine
//!
//! Sync state machine and replication engine for Fleetsync.
//!
//! This crate provides:
//! - Sync state machine (idle → querying → pulling → pushing → synced)
//! - Range-set based transfer planning
//! - Retry with exponential backoff
//! - Transport abstraction with mock and in-process loopback impls
//! - Versioned-repository replication
//!
//! ## Architecture
//!
//! Event logs never converge by overwriting: every participant appends to
//! its own log, and replication copies event ids a peer is missing. One
//! cycle of [`LogSync`] queries the peer's [`LogDescriptor`] set, diffs it
//! against the local [`LogStore`]'s id ranges in both directions, and then
//! transfers exactly the missing events in bounded batches. Applying a
//! batch is idempotent, so an aborted cycle can always be rerun.
//!
//! [`RepositorySync`] replicates a versioned repository the same way, one
//! stored version at a time, resumable at any point.
//!
//! ## Key Invariants
//!
//! - A sync cycle only ever adds events; nothing is rewritten
//! - Applying a transferred batch twice is a no-op
//! - Two honest peers reach a fixed point (no transfers) in bounded rounds
//! - Retry policy lives in [`LogSync::sync_with_retry`] only; no hidden
//!   internal retries
//!
//! [`LogDescriptor`]: fleetsync_protocol::LogDescriptor
//! [`LogStore`]: fleetsync_log::LogStore

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod replica;
mod state;
mod transport;

pub use config::{RetryConfig, SyncConfig, SyncDirection};
pub use error::{EngineError, EngineResult};
pub use replica::{
    LoopbackRepositoryTransport, MockRepositoryTransport, ReplicationReport, RepositorySync,
    RepositoryTransport,
};
pub use state::{LogSync, SyncCycleResult, SyncState, SyncStats};
pub use transport::{LogTransport, LoopbackTransport, MockTransport};
