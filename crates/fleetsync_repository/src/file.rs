//! File-backed repository implementation.
//!
//! On-disk layout:
//!
//! ```text
//! <repo_path>/
//! ├─ LOCK              # Advisory lock, single process
//! ├─ HEAD              # Current head version, decimal text
//! └─ versions/
//!    └─ 0000000000000001.dat   # One blob per committed version
//! ```
//!
//! Every update follows write-to-temp / fsync / atomic-rename / fsync-dir,
//! and a version blob always lands before HEAD moves. A crash can therefore
//! leave at most a stray blob above HEAD, which reopen discards — it belongs
//! to a commit that never completed.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::{Repository, RepositoryReplication};
use fleetsync_rangeset::RangeSet;

/// File names within the repository directory.
const HEAD_FILE: &str = "HEAD";
const LOCK_FILE: &str = "LOCK";
const VERSIONS_DIR: &str = "versions";
/// Temporary file for atomic HEAD writes.
const HEAD_TEMP: &str = "HEAD.tmp";
/// Extension of version blob files.
const BLOB_EXT: &str = "dat";

/// In-memory view of what is on disk, kept in sync under the write lock.
#[derive(Debug)]
struct FileState {
    head: u64,
    versions: RangeSet,
}

/// A file-backed [`Repository`] holding one blob file per version.
///
/// # Thread Safety
///
/// Safe to share across threads; commits serialize on an internal write
/// lock. Across processes, the `LOCK` file keeps a second opener out
/// entirely.
///
/// # Example
///
/// ```no_run
/// use fleetsync_repository::{FileRepository, Repository};
/// use std::path::Path;
///
/// let repo = FileRepository::open(Path::new("shop-config"), true)?;
/// let head = repo.head()?;
/// repo.commit(b"<config/>", head)?;
/// # Ok::<(), fleetsync_repository::RepositoryError>(())
/// ```
#[derive(Debug)]
pub struct FileRepository {
    root: PathBuf,
    state: RwLock<FileState>,
    /// Held for the lifetime of the repository; released on drop.
    _lock_file: File,
}

impl FileRepository {
    /// Opens or creates a repository directory.
    ///
    /// Reads HEAD, scans the version blobs, and discards artifacts of an
    /// interrupted commit (temp files, blobs above HEAD).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory doesn't exist and `create_if_missing` is false
    /// - another process holds the lock (returns
    ///   [`RepositoryError::Locked`])
    /// - the HEAD file is unreadable ([`RepositoryError::Corrupt`])
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> RepositoryResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(RepositoryError::corrupt(format!(
                    "repository directory does not exist: {}",
                    path.display()
                )));
            }
        }
        if !path.is_dir() {
            return Err(RepositoryError::corrupt(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(RepositoryError::Locked {
                path: path.to_path_buf(),
            });
        }

        let versions_dir = path.join(VERSIONS_DIR);
        fs::create_dir_all(&versions_dir)?;

        let head = read_head(&path.join(HEAD_FILE))?;
        let versions = scan_versions(&versions_dir, head)?;
        debug!(
            path = %path.display(),
            head,
            versions = %versions,
            "opened file repository"
        );

        Ok(Self {
            root: path.to_path_buf(),
            state: RwLock::new(FileState { head, versions }),
            _lock_file: lock_file,
        })
    }

    /// Returns the repository directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn version_path(&self, version: u64) -> PathBuf {
        self.root
            .join(VERSIONS_DIR)
            .join(format!("{version:016}.{BLOB_EXT}"))
    }

    /// Writes a version blob atomically: temp file, fsync, rename, fsync of
    /// the versions directory.
    fn write_blob(&self, version: u64, data: &[u8]) -> RepositoryResult<()> {
        let final_path = self.version_path(version);
        let temp_path = final_path.with_extension("tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &final_path)?;
        sync_directory(&self.root.join(VERSIONS_DIR))?;
        Ok(())
    }

    /// Moves HEAD atomically. Must only be called after the corresponding
    /// blob has landed.
    fn write_head(&self, head: u64) -> RepositoryResult<()> {
        let head_path = self.root.join(HEAD_FILE);
        let temp_path = self.root.join(HEAD_TEMP);

        let mut file = File::create(&temp_path)?;
        file.write_all(format!("{head}\n").as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &head_path)?;
        sync_directory(&self.root)?;
        Ok(())
    }
}

impl Repository for FileRepository {
    fn checkout(&self, version: u64) -> RepositoryResult<Vec<u8>> {
        {
            let state = self.state.read();
            if !state.versions.contains(version) {
                return Err(RepositoryError::NotFound { version });
            }
        }
        // Blobs are never rewritten or deleted while open, so reading
        // outside the lock is safe.
        Ok(fs::read(self.version_path(version))?)
    }

    fn commit(&self, data: &[u8], from_version: u64) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        if from_version != state.head {
            debug!(
                from_version,
                head = state.head,
                "rejecting stale commit"
            );
            return Ok(false);
        }
        let next = state
            .head
            .checked_add(1)
            .ok_or_else(|| RepositoryError::corrupt("version counter exhausted"))?;
        self.write_blob(next, data)?;
        self.write_head(next)?;
        state.head = next;
        state.versions.add(next);
        debug!(version = next, bytes = data.len(), "committed version");
        Ok(true)
    }

    fn get_range(&self) -> RepositoryResult<RangeSet> {
        Ok(self.state.read().versions.clone())
    }

    fn head(&self) -> RepositoryResult<u64> {
        Ok(self.state.read().head)
    }
}

impl RepositoryReplication for FileRepository {
    fn store_version(&self, version: u64, data: &[u8]) -> RepositoryResult<()> {
        if version == 0 {
            return Err(RepositoryError::InvalidVersion { version });
        }
        let mut state = self.state.write();
        self.write_blob(version, data)?;
        if version > state.head {
            self.write_head(version)?;
            state.head = version;
        }
        state.versions.add(version);
        Ok(())
    }
}

/// Reads the HEAD file; absent means an empty repository.
fn read_head(path: &Path) -> RepositoryResult<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let text = fs::read_to_string(path)?;
    text.trim()
        .parse()
        .map_err(|_| RepositoryError::corrupt(format!("HEAD is not a version number: {text:?}")))
}

/// Scans the versions directory into a range, discarding leftovers of an
/// interrupted commit: temp files and blobs above HEAD (their commit never
/// completed, so no caller ever saw them succeed).
fn scan_versions(dir: &Path, head: u64) -> RepositoryResult<RangeSet> {
    let mut versions = RangeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(version) = blob_version(&path) else {
            warn!(path = %path.display(), "removing unrecognized file from versions directory");
            let _ = fs::remove_file(&path);
            continue;
        };
        if version > head {
            warn!(version, head, "removing version blob from incomplete commit");
            fs::remove_file(&path)?;
            continue;
        }
        versions.add(version);
    }
    Ok(versions)
}

/// Parses `0000000000000042.dat` into `Some(42)`.
fn blob_version(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXT) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Fsyncs a directory so renames inside it are durable.
///
/// Windows has no directory fsync; NTFS journaling covers metadata there.
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

    #[test]
    fn test_open_creates_layout() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        let repo = FileRepository::open(&path, true).unwrap();
        assert_eq!(repo.head().unwrap(), 0);
        assert!(path.join("LOCK").exists());
        assert!(path.join("versions").is_dir());
    }

    #[test]
    fn test_open_fails_if_missing_and_no_create() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nonexistent");
        assert!(FileRepository::open(&path, false).is_err());
    }

    #[test]
    fn test_lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        let _repo = FileRepository::open(&path, true).unwrap();
        assert!(matches!(
            FileRepository::open(&path, true),
            Err(RepositoryError::Locked { .. })
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let _repo = FileRepository::open(&path, true).unwrap();
        }
        let _repo = FileRepository::open(&path, true).unwrap();
    }

    #[test]
    fn test_commit_checkout_round_trip() {
        let temp = tempdir().unwrap();
        let repo = FileRepository::open(&temp.path().join("repo"), true).unwrap();

        assert!(repo.commit(b"first", 0).unwrap());
        assert!(repo.commit(b"second", 1).unwrap());
        assert!(!repo.commit(b"stale", 1).unwrap());

        assert_eq!(repo.head().unwrap(), 2);
        assert_eq!(repo.checkout(1).unwrap(), b"first");
        assert_eq!(repo.checkout(2).unwrap(), b"second");
        assert_eq!(repo.get_range().unwrap().to_string(), "1-2");
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let repo = FileRepository::open(&path, true).unwrap();
            repo.commit(b"persisted", 0).unwrap();
        }

        let repo = FileRepository::open(&path, true).unwrap();
        assert_eq!(repo.head().unwrap(), 1);
        assert_eq!(repo.checkout(1).unwrap(), b"persisted");

        // And commits keep working from the recovered head.
        assert!(repo.commit(b"more", 1).unwrap());
        assert_eq!(repo.head().unwrap(), 2);
    }

    #[test]
    fn test_head_file_is_decimal_text() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        let repo = FileRepository::open(&path, true).unwrap();
        repo.commit(b"x", 0).unwrap();
        drop(repo);

        assert_eq!(fs::read_to_string(path.join("HEAD")).unwrap(), "1\n");
    }

    #[test]
    fn test_stray_blob_above_head_is_dropped_on_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let repo = FileRepository::open(&path, true).unwrap();
            repo.commit(b"real", 0).unwrap();
        }

        // Simulate a crash between blob rename and HEAD update.
        let stray = path.join("versions").join(format!("{:016}.dat", 2));
        fs::write(&stray, b"half-committed").unwrap();

        let repo = FileRepository::open(&path, true).unwrap();
        assert_eq!(repo.head().unwrap(), 1);
        assert_eq!(repo.get_range().unwrap().to_string(), "1");
        assert!(!stray.exists());

        // The next commit reuses the slot the stray occupied.
        assert!(repo.commit(b"clean", 1).unwrap());
        assert_eq!(repo.checkout(2).unwrap(), b"clean");
    }

    #[test]
    fn test_stale_temp_files_are_swept() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let _repo = FileRepository::open(&path, true).unwrap();
        }
        let leftover = path.join("versions").join("0000000000000005.tmp");
        fs::write(&leftover, b"torn").unwrap();

        let _repo = FileRepository::open(&path, true).unwrap();
        assert!(!leftover.exists());
    }

    #[test]
    fn test_corrupt_head_is_reported() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let _repo = FileRepository::open(&path, true).unwrap();
        }
        fs::write(path.join("HEAD"), "not-a-number\n").unwrap();

        assert!(matches!(
            FileRepository::open(&path, true),
            Err(RepositoryError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_sparse_replica_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("repo");

        {
            let repo = FileRepository::open(&path, true).unwrap();
            repo.store_version(7, b"seven").unwrap();
            repo.store_version(3, b"three").unwrap();
        }

        let repo = FileRepository::open(&path, true).unwrap();
        assert_eq!(repo.head().unwrap(), 7);
        assert_eq!(repo.get_range().unwrap().to_string(), "3,7");
        assert_eq!(repo.checkout(7).unwrap(), b"seven");
        assert!(matches!(
            repo.checkout(4),
            Err(RepositoryError::NotFound { version: 4 })
        ));
    }
}
