//! The versioned repository traits.

use crate::error::RepositoryResult;
use fleetsync_rangeset::RangeSet;

/// A linear-history, optimistic-concurrency store of opaque byte blobs.
///
/// Versions are 1-based: an empty repository has `head() == 0`, the first
/// successful commit creates version 1. History never branches; the only
/// way to advance it is a [`commit`](Repository::commit) whose base version
/// still matches the current head.
///
/// # Conflict semantics
///
/// A stale commit is an expected outcome, reported as `Ok(false)` with all
/// state unchanged. Callers that lose the race re-checkout the new head and
/// retry with an updated base version; the repository itself never blocks,
/// waits, or retries.
///
/// # Failure semantics
///
/// Storage I/O failures are returned to the caller unchanged and are never
/// silently retried inside the repository.
pub trait Repository: Send + Sync {
    /// Returns the blob committed at `version`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`](crate::RepositoryError::NotFound) when
    /// `version` is not in [`get_range`](Repository::get_range) (version 0
    /// is never in range).
    fn checkout(&self, version: u64) -> RepositoryResult<Vec<u8>>;

    /// Compare-and-swap commit.
    ///
    /// Persists `data` as `head = from_version + 1` and returns `true` only
    /// when `from_version` equals the current head. Otherwise returns
    /// `false` and leaves all state unchanged.
    ///
    /// # Errors
    ///
    /// Storage failures only; a stale base version is `Ok(false)`.
    fn commit(&self, data: &[u8], from_version: u64) -> RepositoryResult<bool>;

    /// The set of versions for which [`checkout`](Repository::checkout)
    /// succeeds.
    ///
    /// Contiguous `1..=head` for a fully local history; possibly sparse for
    /// a partial replica.
    fn get_range(&self) -> RepositoryResult<RangeSet>;

    /// The latest version, or 0 for an empty repository.
    fn head(&self) -> RepositoryResult<u64> {
        Ok(self.get_range()?.highest().unwrap_or(0))
    }
}

/// Replica-side ingest extension of [`Repository`].
///
/// A device that replicates a central repository receives versions out of
/// band (possibly sparsely, possibly out of order) and installs them with
/// [`store_version`](RepositoryReplication::store_version), bypassing the
/// commit CAS. The head rises to at least the stored version, so a replica
/// that has received only version 7 reports `head() == 7` and range `"7"`.
pub trait RepositoryReplication: Repository {
    /// Installs `data` as `version` without a CAS check.
    ///
    /// Re-storing an already-present version replaces its content, so a
    /// resumed replication pass is harmless.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::InvalidVersion`](crate::RepositoryError::InvalidVersion)
    /// for version 0; storage failures otherwise.
    fn store_version(&self, version: u64, data: &[u8]) -> RepositoryResult<()>;
}
