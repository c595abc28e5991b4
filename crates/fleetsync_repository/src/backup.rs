//! Current-plus-rollback storage for a single resource.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::RepositoryResult;

/// File names within a backup directory.
const CURRENT_FILE: &str = "current.dat";
const BACKUP_FILE: &str = "backup.dat";

/// Two-slot store: a `current` copy of one resource plus exactly one
/// rollback snapshot.
///
/// There are no version numbers here; this is the local working-copy side
/// of a versioned repository, not a history. The `backup` slot is always
/// either empty or a complete prior snapshot of `current` — never a partial
/// one, which is why [`write`](BackupRepository::write) must be atomic with
/// respect to process failure.
///
/// Operations on one resource are mutually exclusive: implementations
/// serialize `write`/`backup`/`restore` internally so they never overlap.
pub trait BackupRepository: Send + Sync {
    /// Replaces the `current` content.
    ///
    /// A crash during `write` leaves the previous content fully intact;
    /// `current` is never observed truncated or mixed.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn write(&self, data: &[u8]) -> RepositoryResult<()>;

    /// Returns `current`, or an empty result if nothing was ever written.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn read(&self) -> RepositoryResult<Vec<u8>>;

    /// Copies `current` into `backup`, overwriting any previous backup.
    ///
    /// Returns `false` when `current` is empty — there is nothing to back
    /// up, and the existing backup is left alone.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn backup(&self) -> RepositoryResult<bool>;

    /// Copies `backup` into `current`.
    ///
    /// Returns `false` when `backup` is empty, leaving `current` untouched.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn restore(&self) -> RepositoryResult<bool>;
}

/// In-memory [`BackupRepository`] for tests and ephemeral resources.
#[derive(Debug, Default)]
pub struct MemoryBackupRepository {
    slots: Mutex<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    current: Vec<u8>,
    backup: Vec<u8>,
}

impl MemoryBackupRepository {
    /// Creates a backup repository with both slots empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupRepository for MemoryBackupRepository {
    fn write(&self, data: &[u8]) -> RepositoryResult<()> {
        self.slots.lock().current = data.to_vec();
        Ok(())
    }

    fn read(&self) -> RepositoryResult<Vec<u8>> {
        Ok(self.slots.lock().current.clone())
    }

    fn backup(&self) -> RepositoryResult<bool> {
        let mut slots = self.slots.lock();
        if slots.current.is_empty() {
            return Ok(false);
        }
        slots.backup = slots.current.clone();
        Ok(true)
    }

    fn restore(&self) -> RepositoryResult<bool> {
        let mut slots = self.slots.lock();
        if slots.backup.is_empty() {
            return Ok(false);
        }
        slots.current = slots.backup.clone();
        Ok(true)
    }
}

/// File-backed [`BackupRepository`]: a directory holding `current.dat` and
/// `backup.dat`.
///
/// All slot updates go through write-to-temp / fsync / atomic-rename, so a
/// crash mid-operation leaves the previous slot content untouched. An empty
/// slot is simply an absent (or zero-length) file.
#[derive(Debug)]
pub struct FileBackupRepository {
    dir: PathBuf,
    /// Serializes write/backup/restore per the trait contract.
    io: Mutex<()>,
}

impl FileBackupRepository {
    /// Opens or creates the backup directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> RepositoryResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            io: Mutex::new(()),
        })
    }

    /// Returns the backup directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Atomically replaces a slot file.
    fn replace_slot(&self, name: &str, data: &[u8]) -> RepositoryResult<()> {
        let final_path = self.slot_path(name);
        let temp_path = final_path.with_extension("tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &final_path)?;
        sync_directory(&self.dir)?;
        Ok(())
    }

    /// Reads a slot; absent files read as empty.
    fn read_slot(&self, name: &str) -> RepositoryResult<Vec<u8>> {
        let path = self.slot_path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read(path)?)
    }
}

impl BackupRepository for FileBackupRepository {
    fn write(&self, data: &[u8]) -> RepositoryResult<()> {
        let _guard = self.io.lock();
        self.replace_slot(CURRENT_FILE, data)
    }

    fn read(&self) -> RepositoryResult<Vec<u8>> {
        let _guard = self.io.lock();
        self.read_slot(CURRENT_FILE)
    }

    fn backup(&self) -> RepositoryResult<bool> {
        let _guard = self.io.lock();
        let current = self.read_slot(CURRENT_FILE)?;
        if current.is_empty() {
            return Ok(false);
        }
        self.replace_slot(BACKUP_FILE, &current)?;
        Ok(true)
    }

    fn restore(&self) -> RepositoryResult<bool> {
        let _guard = self.io.lock();
        let backup = self.read_slot(BACKUP_FILE)?;
        if backup.is_empty() {
            return Ok(false);
        }
        self.replace_slot(CURRENT_FILE, &backup)?;
        Ok(true)
    }
}

/// Fsyncs a directory so renames inside it are durable.
#[cfg(unix)]
fn sync_directory(path: &Path) -> RepositoryResult<()> {
    let dir = File::open(path)?;
    dir.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> RepositoryResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn backends() -> Vec<(&'static str, Box<dyn BackupRepository>, Option<tempfile::TempDir>)> {
        let temp = tempdir().unwrap();
        let file = FileBackupRepository::open(&temp.path().join("slot")).unwrap();
        vec![
            ("memory", Box::new(MemoryBackupRepository::new()), None),
            ("file", Box::new(file), Some(temp)),
        ]
    }

    #[test]
    fn test_read_before_any_write_is_empty() {
        for (name, repo, _guard) in backends() {
            assert!(repo.read().unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn test_write_then_read() {
        for (name, repo, _guard) in backends() {
            repo.write(b"payload").unwrap();
            assert_eq!(repo.read().unwrap(), b"payload", "{name}");
            repo.write(b"replaced").unwrap();
            assert_eq!(repo.read().unwrap(), b"replaced", "{name}");
        }
    }

    #[test]
    fn test_backup_write_restore_cycle() {
        for (name, repo, _guard) in backends() {
            repo.write(b"original").unwrap();
            assert!(repo.backup().unwrap(), "{name}");
            repo.write(b"edited").unwrap();
            assert!(repo.restore().unwrap(), "{name}");
            assert_eq!(repo.read().unwrap(), b"original", "{name}");
        }
    }

    #[test]
    fn test_backup_of_empty_current_returns_false() {
        for (name, repo, _guard) in backends() {
            assert!(!repo.backup().unwrap(), "{name}");

            // An existing backup is not clobbered by a no-op backup call.
            repo.write(b"kept").unwrap();
            repo.backup().unwrap();
            repo.write(b"").unwrap();
            assert!(!repo.backup().unwrap(), "{name}");
            assert!(repo.restore().unwrap(), "{name}");
            assert_eq!(repo.read().unwrap(), b"kept", "{name}");
        }
    }

    #[test]
    fn test_restore_with_empty_backup_returns_false() {
        for (name, repo, _guard) in backends() {
            repo.write(b"untouched").unwrap();
            assert!(!repo.restore().unwrap(), "{name}");
            assert_eq!(repo.read().unwrap(), b"untouched", "{name}");
        }
    }

    #[test]
    fn test_backup_overwrites_previous_backup() {
        for (name, repo, _guard) in backends() {
            repo.write(b"one").unwrap();
            repo.backup().unwrap();
            repo.write(b"two").unwrap();
            repo.backup().unwrap();
            repo.write(b"three").unwrap();
            assert!(repo.restore().unwrap(), "{name}");
            assert_eq!(repo.read().unwrap(), b"two", "{name}");
        }
    }

    #[test]
    fn test_file_layout_leaves_no_temp_files() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("slot");
        let repo = FileBackupRepository::open(&dir).unwrap();

        repo.write(b"data").unwrap();
        repo.backup().unwrap();

        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");
        assert!(names.contains(&"current.dat".to_string()));
        assert!(names.contains(&"backup.dat".to_string()));
    }

    #[test]
    fn test_file_state_survives_reopen() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("slot");

        {
            let repo = FileBackupRepository::open(&dir).unwrap();
            repo.write(b"persisted").unwrap();
            repo.backup().unwrap();
            repo.write(b"newer").unwrap();
        }

        let repo = FileBackupRepository::open(&dir).unwrap();
        assert_eq!(repo.read().unwrap(), b"newer");
        assert!(repo.restore().unwrap());
        assert_eq!(repo.read().unwrap(), b"persisted");
    }
}
