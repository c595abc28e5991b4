//! Append-only audit event logs for Fleetsync.
//!
//! Every device (and the server mirroring it) keeps per-subject event logs:
//! a [`LogEvent`] records one audit fact (framework started, bundle
//! installed, deployment completed, ...) under a `log_id` identifying the
//! subject's stream. Event ids are assigned by the owning [`LogStore`],
//! strictly increasing and never reused, which is what makes the id set of a
//! log expressible as a compact
//! [`RangeSet`](fleetsync_rangeset::RangeSet) — the store's half of the
//! range-diff replication protocol.
//!
//! Replicated events arrive with their ids already assigned and are applied
//! through [`LogStore::insert`], which is idempotent: re-applying an event
//! the store already holds is a counted no-op, so an aborted transfer can
//! simply be rerun.
//!
//! Two stores are provided: [`MemoryLogStore`] and the persistent
//! [`FileLogStore`] (one append-only line file per log, `$`-escaped single
//! line per event).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod event;
mod file;
mod memory;
mod store;

pub use codec::{decode_event, encode_event, escape, unescape};
pub use error::{LogError, LogResult};
pub use event::{EventProperties, EventType, LogEvent};
pub use file::FileLogStore;
pub use memory::MemoryLogStore;
pub use store::LogStore;
