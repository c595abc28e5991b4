//! In-memory repository implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::{Repository, RepositoryReplication};
use fleetsync_rangeset::RangeSet;

/// An in-memory [`Repository`] for tests and ephemeral state.
///
/// # Thread Safety
///
/// All state sits behind a single `RwLock`; commits serialize on the write
/// lock, which is exactly the per-instance CAS boundary the contract
/// requires.
///
/// # Example
///
/// ```
/// use fleetsync_repository::{MemoryRepository, Repository};
///
/// let repo = MemoryRepository::new();
/// assert!(repo.commit(b"v1", 0)?);
/// assert!(!repo.commit(b"stale", 0)?);
/// assert_eq!(repo.checkout(1)?, b"v1");
/// # Ok::<(), fleetsync_repository::RepositoryError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryRepository {
    versions: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryRepository {
    fn checkout(&self, version: u64) -> RepositoryResult<Vec<u8>> {
        self.versions
            .read()
            .get(&version)
            .cloned()
            .ok_or(RepositoryError::NotFound { version })
    }

    fn commit(&self, data: &[u8], from_version: u64) -> RepositoryResult<bool> {
        let mut versions = self.versions.write();
        let head = versions.keys().next_back().copied().unwrap_or(0);
        if from_version != head {
            return Ok(false);
        }
        let next = head
            .checked_add(1)
            .ok_or_else(|| RepositoryError::corrupt("version counter exhausted"))?;
        versions.insert(next, data.to_vec());
        Ok(true)
    }

    fn get_range(&self) -> RepositoryResult<RangeSet> {
        Ok(self.versions.read().keys().copied().collect())
    }

    fn head(&self) -> RepositoryResult<u64> {
        Ok(self.versions.read().keys().next_back().copied().unwrap_or(0))
    }
}

impl RepositoryReplication for MemoryRepository {
    fn store_version(&self, version: u64, data: &[u8]) -> RepositoryResult<()> {
        if version == 0 {
            return Err(RepositoryError::InvalidVersion { version });
        }
        self.versions.write().insert(version, data.to_vec());
        Ok(())
    }
}
