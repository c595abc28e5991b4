//! Versioned content repositories for Fleetsync.
//!
//! A [`Repository`] is a linear-history store of opaque byte blobs: version 1
//! is the first commit, version `head` the latest, and the only mutation path
//! is [`Repository::commit`] — a compare-and-swap that succeeds only when the
//! caller's base version still matches the head. Conflicts are an expected
//! outcome (`Ok(false)`), not an error; losers re-checkout and retry.
//!
//! Which versions a repository actually holds is expressed as a
//! [`RangeSet`](fleetsync_rangeset::RangeSet) rather than a bare integer,
//! because a device-side replica may hold a sparse subset of the history.
//! [`RepositoryReplication::store_version`] is the ingest path for such
//! replicas.
//!
//! The crate also provides the [`BackupRepository`] — a current-plus-one-
//! rollback slot pair for a single resource — and [`CachedRepository`], the
//! device-side working copy that ties a remote repository and a local backup
//! together into the checkout / edit / commit / revert cycle.
//!
//! Two implementations exist for each storage trait: an in-memory one for
//! tests and ephemeral use, and a file-backed one using an advisory `LOCK`
//! file and write-to-temp-then-rename updates so that a crash never leaves
//! torn state behind.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod cached;
mod error;
mod file;
mod memory;
mod repository;

pub use backup::{BackupRepository, FileBackupRepository, MemoryBackupRepository};
pub use cached::CachedRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use file::FileRepository;
pub use memory::MemoryRepository;
pub use repository::{Repository, RepositoryReplication};
