//! Versioned-repository replication.
//!
//! Repositories replicate by the same algebra as event logs: ask the
//! remote side which versions it holds, subtract what is already local,
//! and copy the difference one version at a time. Each copied version is
//! durable on its own, so replication can be aborted and resumed at any
//! point without redoing finished work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use fleetsync_rangeset::RangeSet;
use fleetsync_repository::{Repository, RepositoryReplication};

/// Read access to a remote versioned repository.
pub trait RepositoryTransport: Send + Sync {
    /// The set of versions the remote side holds.
    ///
    /// # Errors
    ///
    /// Transport failures, or a malformed answer from the peer.
    fn range(&self) -> EngineResult<RangeSet>;

    /// Fetches the content of one remote version.
    ///
    /// # Errors
    ///
    /// Transport failures, or the peer not serving the version.
    fn checkout(&self, version: u64) -> EngineResult<Vec<u8>>;
}

/// Serves a local [`Repository`] as a remote peer, for tests and
/// in-process mirroring.
pub struct LoopbackRepositoryTransport {
    remote: Arc<dyn Repository>,
}

impl LoopbackRepositoryTransport {
    /// Creates a loopback peer over `remote`.
    #[must_use]
    pub fn new(remote: Arc<dyn Repository>) -> Self {
        Self { remote }
    }
}

impl RepositoryTransport for LoopbackRepositoryTransport {
    fn range(&self) -> EngineResult<RangeSet> {
        Ok(self.remote.get_range()?)
    }

    fn checkout(&self, version: u64) -> EngineResult<Vec<u8>> {
        Ok(self.remote.checkout(version)?)
    }
}

/// A mock repository peer answering from canned versions.
///
/// [`set_version`](MockRepositoryTransport::set_version) extends the
/// advertised range; [`set_range`](MockRepositoryTransport::set_range)
/// overrides it, which lets a test make the peer claim versions it cannot
/// serve.
#[derive(Default)]
pub struct MockRepositoryTransport {
    range: Mutex<RangeSet>,
    versions: Mutex<HashMap<u64, Vec<u8>>>,
}

impl MockRepositoryTransport {
    /// Creates an empty mock peer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the advertised version range.
    pub fn set_range(&self, range: RangeSet) {
        *self.range.lock() = range;
    }

    /// Stores content for a version and advertises it.
    pub fn set_version(&self, version: u64, data: impl Into<Vec<u8>>) {
        self.versions.lock().insert(version, data.into());
        self.range.lock().add(version);
    }
}

impl RepositoryTransport for MockRepositoryTransport {
    fn range(&self) -> EngineResult<RangeSet> {
        Ok(self.range.lock().clone())
    }

    fn checkout(&self, version: u64) -> EngineResult<Vec<u8>> {
        self.versions
            .lock()
            .get(&version)
            .cloned()
            .ok_or_else(|| EngineError::transport_fatal(format!("peer cannot serve version {version}")))
    }
}

/// Outcome of one replication pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Versions copied in this pass.
    pub copied: u64,
    /// Highest version the remote side advertised; 0 when it is empty.
    pub remote_head: u64,
}

/// Mirrors a remote repository into a local replica.
///
/// A pass recomputes the missing set from scratch, so whatever earlier
/// passes (or an aborted one) already stored is never copied again.
pub struct RepositorySync<T: RepositoryTransport> {
    transport: Arc<T>,
    local: Arc<dyn RepositoryReplication>,
    cancelled: AtomicBool,
}

impl<T: RepositoryTransport> RepositorySync<T> {
    /// Creates a replicator from `transport` into `local`.
    pub fn new(transport: T, local: Arc<dyn RepositoryReplication>) -> Self {
        Self {
            transport: Arc::new(transport),
            local,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Cancels an ongoing pass; the next version boundary aborts it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Copies every remote version the local replica is missing.
    ///
    /// # Errors
    ///
    /// Transport and repository failures, or [`EngineError::Cancelled`]
    /// when [`cancel`](RepositorySync::cancel) was called. Versions stored
    /// before the failure stay stored.
    pub fn sync(&self) -> EngineResult<ReplicationReport> {
        self.cancelled.store(false, Ordering::SeqCst);

        let remote_range = self.transport.range()?;
        let local_range = self.local.get_range()?;
        let missing = remote_range.difference(&local_range);

        let mut copied = 0u64;
        for version in missing.iter() {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(EngineError::Cancelled);
            }
            let data = self.transport.checkout(version)?;
            self.local.store_version(version, &data)?;
            copied += 1;
        }

        let report = ReplicationReport {
            copied,
            remote_head: remote_range.highest().unwrap_or(0),
        };
        debug!(
            copied = report.copied,
            remote_head = report.remote_head,
            "repository replication pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetsync_repository::MemoryRepository;

    fn remote_with_versions(count: u64) -> Arc<MemoryRepository> {
        let remote = Arc::new(MemoryRepository::new());
        for i in 0..count {
            let data = format!("version {}", i + 1);
            assert!(remote.commit(data.as_bytes(), i).unwrap());
        }
        remote
    }

    #[test]
    fn test_replicates_everything_from_scratch() {
        let remote = remote_with_versions(3);
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        let report = sync.sync().unwrap();

        assert_eq!(report.copied, 3);
        assert_eq!(report.remote_head, 3);
        assert_eq!(local.get_range().unwrap().to_string(), "1-3");
        assert_eq!(local.checkout(2).unwrap(), b"version 2");
    }

    #[test]
    fn test_replication_fills_gaps_only() {
        let remote = remote_with_versions(4);
        let local = Arc::new(MemoryRepository::new());
        local.store_version(1, b"version 1").unwrap();
        local.store_version(3, b"version 3").unwrap();

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        let report = sync.sync().unwrap();

        assert_eq!(report.copied, 2);
        assert_eq!(local.get_range().unwrap().to_string(), "1-4");
    }

    #[test]
    fn test_up_to_date_pass_copies_nothing() {
        let remote = remote_with_versions(2);
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        sync.sync().unwrap();
        let second = sync.sync().unwrap();
        assert_eq!(second.copied, 0);
        assert_eq!(second.remote_head, 2);
    }

    #[test]
    fn test_empty_remote() {
        let remote = Arc::new(MemoryRepository::new());
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        let report = sync.sync().unwrap();
        assert_eq!(report.copied, 0);
        assert_eq!(report.remote_head, 0);
    }

    #[test]
    fn test_mock_peer_serves_canned_versions() {
        let transport = MockRepositoryTransport::new();
        transport.set_version(1, b"one".to_vec());
        transport.set_version(2, b"two".to_vec());
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(transport, Arc::clone(&local) as Arc<dyn RepositoryReplication>);
        let report = sync.sync().unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(local.checkout(1).unwrap(), b"one");
    }

    #[test]
    fn test_mock_peer_claiming_unserveable_version_fails() {
        let transport = MockRepositoryTransport::new();
        transport.set_version(1, b"one".to_vec());
        transport.set_range(RangeSet::parse("1-2").unwrap());
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(transport, Arc::clone(&local) as Arc<dyn RepositoryReplication>);
        let err = sync.sync().unwrap_err();
        assert!(matches!(err, EngineError::Transport { retryable: false, .. }));

        // Version 1 was stored before the failure and survives it.
        assert_eq!(local.get_range().unwrap().to_string(), "1");
    }

    #[test]
    fn test_interrupted_pass_resumes_cleanly() {
        let remote = remote_with_versions(3);
        let local = Arc::new(MemoryRepository::new());
        // Simulate an aborted earlier pass that got version 1 only.
        local.store_version(1, &remote.checkout(1).unwrap()).unwrap();

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        let report = sync.sync().unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(local.get_range().unwrap().to_string(), "1-3");
    }

    #[test]
    fn test_cancelled_before_pass() {
        let remote = remote_with_versions(2);
        let local = Arc::new(MemoryRepository::new());

        let sync = RepositorySync::new(
            LoopbackRepositoryTransport::new(Arc::clone(&remote) as Arc<dyn Repository>),
            Arc::clone(&local) as Arc<dyn RepositoryReplication>,
        );
        // sync() clears the flag at entry; cancellation is for aborting a
        // pass from another thread, so verify the flag mechanics directly.
        sync.cancel();
        assert!(sync.cancelled.load(Ordering::SeqCst));
        let report = sync.sync().unwrap();
        assert!(!sync.cancelled.load(Ordering::SeqCst));
        assert_eq!(report.copied, 2);
    }
}
