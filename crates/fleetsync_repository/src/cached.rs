//! Device-side working copy over a remote repository.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backup::BackupRepository;
use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::Repository;

#[derive(Debug, Default)]
struct WorkingState {
    /// Version the working copy was last checked out from (0 = nothing).
    checked_out: u64,
    /// Local edits since the last checkout/commit.
    dirty: bool,
}

/// A working copy combining a remote [`Repository`] with a local
/// [`BackupRepository`].
///
/// This is the client half of the optimistic-concurrency cycle:
/// [`checkout`](CachedRepository::checkout) pulls the remote head into the
/// local slot and snapshots it, [`write_local`](CachedRepository::write_local)
/// edits the copy, [`commit`](CachedRepository::commit) pushes it back with
/// a CAS from the checked-out version, and
/// [`revert`](CachedRepository::revert) rolls the copy back to the snapshot.
/// A `false` from `commit` means someone else advanced the head first —
/// re-checkout and reapply.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fleetsync_repository::{
///     CachedRepository, MemoryBackupRepository, MemoryRepository, Repository,
/// };
///
/// let remote = Arc::new(MemoryRepository::new());
/// remote.commit(b"shared state", 0)?;
///
/// let cached = CachedRepository::new(
///     remote.clone(),
///     Arc::new(MemoryBackupRepository::new()),
/// );
/// cached.checkout(false)?;
/// cached.write_local(b"shared state, edited")?;
/// assert!(cached.commit()?);
/// assert_eq!(remote.checkout(2)?, b"shared state, edited");
/// # Ok::<(), fleetsync_repository::RepositoryError>(())
/// ```
pub struct CachedRepository {
    remote: Arc<dyn Repository>,
    local: Arc<dyn BackupRepository>,
    state: Mutex<WorkingState>,
}

impl CachedRepository {
    /// Wires a remote repository to a local backup slot.
    #[must_use]
    pub fn new(remote: Arc<dyn Repository>, local: Arc<dyn BackupRepository>) -> Self {
        Self {
            remote,
            local,
            state: Mutex::new(WorkingState::default()),
        }
    }

    /// Fetches the remote head into the working copy and snapshots it.
    ///
    /// Returns the fetched content (empty when the remote is empty; in that
    /// case the rollback slot is left as it was). With `fail_if_dirty`,
    /// unsaved local edits abort the checkout instead of being discarded.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::DirtyWorkingCopy`] when `fail_if_dirty` is set
    /// and edits exist; remote/storage failures otherwise.
    pub fn checkout(&self, fail_if_dirty: bool) -> RepositoryResult<Vec<u8>> {
        let mut state = self.state.lock();
        if state.dirty && fail_if_dirty {
            return Err(RepositoryError::DirtyWorkingCopy);
        }
        let head = self.remote.head()?;
        let data = if head == 0 {
            Vec::new()
        } else {
            self.remote.checkout(head)?
        };
        self.local.write(&data)?;
        self.local.backup()?;
        state.checked_out = head;
        state.dirty = false;
        Ok(data)
    }

    /// Reads the working copy.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub fn read_local(&self) -> RepositoryResult<Vec<u8>> {
        self.local.read()
    }

    /// Replaces the working copy, marking it dirty.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub fn write_local(&self, data: &[u8]) -> RepositoryResult<()> {
        let mut state = self.state.lock();
        self.local.write(data)?;
        state.dirty = true;
        Ok(())
    }

    /// Pushes the working copy to the remote, CAS-based on the checked-out
    /// version.
    ///
    /// On success the working copy becomes the new clean snapshot. `false`
    /// means the remote head moved; re-[`checkout`](CachedRepository::checkout)
    /// and retry.
    ///
    /// # Errors
    ///
    /// Remote/storage failures; a lost race is `Ok(false)`.
    pub fn commit(&self) -> RepositoryResult<bool> {
        let mut state = self.state.lock();
        let data = self.local.read()?;
        if !self.remote.commit(&data, state.checked_out)? {
            return Ok(false);
        }
        state.checked_out = state
            .checked_out
            .checked_add(1)
            .ok_or_else(|| RepositoryError::corrupt("version counter exhausted"))?;
        state.dirty = false;
        self.local.backup()?;
        Ok(true)
    }

    /// Discards local edits, restoring the snapshot taken at the last
    /// checkout or successful commit.
    ///
    /// Returns `false` (working copy untouched) when no snapshot exists.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub fn revert(&self) -> RepositoryResult<bool> {
        let mut state = self.state.lock();
        let restored = self.local.restore()?;
        if restored {
            state.dirty = false;
        }
        Ok(restored)
    }

    /// Version the working copy is based on (0 before any checkout).
    #[must_use]
    pub fn most_recent_version(&self) -> u64 {
        self.state.lock().checked_out
    }

    /// Whether unsaved local edits exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Whether the working copy is based on the current remote head.
    ///
    /// # Errors
    ///
    /// Remote failures only.
    pub fn is_current(&self) -> RepositoryResult<bool> {
        Ok(self.state.lock().checked_out == self.remote.head()?)
    }
}
