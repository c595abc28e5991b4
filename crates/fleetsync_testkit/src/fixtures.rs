//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common replication scenarios.

use fleetsync_log::{EventProperties, EventType, FileLogStore, LogEvent, LogStore};
use fleetsync_repository::FileRepository;
use std::path::PathBuf;
use tempfile::TempDir;

/// A file-backed log store in a temporary directory, with automatic cleanup.
pub struct TestLogStore {
    /// The store instance.
    pub store: FileLogStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestLogStore {
    /// Creates a new file-backed test log store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileLogStore::open(&temp_dir.path().join("store"), true)
            .expect("Failed to open log store");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the store directory.
    pub fn path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// Drops the store and opens the same directory again.
    ///
    /// This is the recovery path: the lock is released, the files are
    /// reloaded, and torn tails are repaired.
    pub fn reopen(self) -> Self {
        let Self { store, _temp_dir } = self;
        let path = store.path().to_path_buf();
        drop(store);
        Self {
            store: FileLogStore::open(&path, false).expect("Failed to reopen log store"),
            _temp_dir,
        }
    }
}

impl Default for TestLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestLogStore {
    type Target = FileLogStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// A file-backed repository in a temporary directory, with automatic cleanup.
pub struct TestRepository {
    /// The repository instance.
    pub repository: FileRepository,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestRepository {
    /// Creates a new file-backed test repository.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let repository = FileRepository::open(&temp_dir.path().join("repo"), true)
            .expect("Failed to open repository");
        Self {
            repository,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the repository directory.
    pub fn path(&self) -> PathBuf {
        self.repository.path().to_path_buf()
    }

    /// Drops the repository and opens the same directory again.
    pub fn reopen(self) -> Self {
        let Self {
            repository,
            _temp_dir,
        } = self;
        let path = repository.path().to_path_buf();
        drop(repository);
        Self {
            repository: FileRepository::open(&path, false).expect("Failed to reopen repository"),
            _temp_dir,
        }
    }
}

impl Default for TestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestRepository {
    type Target = FileRepository;

    fn deref(&self) -> &Self::Target {
        &self.repository
    }
}

/// Runs a test with a temporary file-backed log store.
///
/// # Example
///
/// ```rust,ignore
/// use fleetsync_testkit::with_temp_log_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_log_store(|store| {
///         let log_id = store.create_log().unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_log_store<F, R>(f: F) -> R
where
    F: FnOnce(&FileLogStore) -> R,
{
    let test_store = TestLogStore::new();
    f(&test_store.store)
}

/// Runs a test with a temporary file-backed repository.
pub fn with_temp_repository<F, R>(f: F) -> R
where
    F: FnOnce(&FileRepository) -> R,
{
    let test_repository = TestRepository::new();
    f(&test_repository.repository)
}

/// A replicated event with a fixed id, as a remote peer would deliver it.
pub fn replicated_event(log_id: u64, event_id: u64) -> LogEvent {
    LogEvent::new(
        log_id,
        event_id,
        EventType::BUNDLE_INSTALLED,
        1000 + event_id,
        EventProperties::new(),
    )
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use fleetsync_log::MemoryLogStore;
    use std::sync::Arc;

    /// Creates a memory store holding the given event ids per log.
    pub fn seeded_memory_store(logs: &[(u64, &[u64])]) -> Arc<MemoryLogStore> {
        let store = Arc::new(MemoryLogStore::new());
        for (log_id, ids) in logs {
            for &id in *ids {
                store
                    .insert(&replicated_event(*log_id, id))
                    .expect("Failed to seed event");
            }
        }
        store
    }

    /// Creates the classic replication scenario: two stores of the same
    /// log holding overlapping id sets `{1,2,3,5}` and `{1,2,4}`.
    pub fn diverged_pair() -> (Arc<MemoryLogStore>, Arc<MemoryLogStore>) {
        (
            seeded_memory_store(&[(1, &[1, 2, 3, 5])]),
            seeded_memory_store(&[(1, &[1, 2, 4])]),
        )
    }

    /// Creates a file store populated through the assigning `put` path.
    pub fn populated_log_store(log_count: u64, events_per_log: u64) -> TestLogStore {
        let test_store = TestLogStore::new();
        for log_id in 1..=log_count {
            for i in 0..events_per_log {
                test_store
                    .store
                    .put(
                        log_id,
                        EventType::BUNDLE_INSTALLED,
                        EventProperties::new().with("index", i.to_string()),
                    )
                    .expect("Failed to put event");
            }
        }
        test_store
    }
}
