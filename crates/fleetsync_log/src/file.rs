//! File-backed log store.
//!
//! On-disk layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock, single process
//! └─ logs/
//!    └─ 00000000000000ff.log   # {log_id:016x}.log, one event line each
//! ```
//!
//! Events are appended as single `$`-escaped lines and fsynced per
//! operation. A complete line always ends in `\n`, so a tail without one is
//! the artifact of a crashed append: reopen drops it (with a warning) and
//! truncates the file back to the last complete line. A malformed line
//! *with* its newline is real corruption and fails the open.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::codec::{decode_event, encode_event};
use crate::error::{LogError, LogResult};
use crate::event::{EventProperties, EventType, LogEvent};
use crate::store::{now_ms, LogStore};
use fleetsync_rangeset::RangeSet;

const LOCK_FILE: &str = "LOCK";
const LOGS_DIR: &str = "logs";
const LOG_EXT: &str = "log";

/// One log's in-memory state plus its backing file.
#[derive(Debug)]
struct FileLog {
    path: PathBuf,
    events: BTreeMap<u64, LogEvent>,
    /// Highest id ever assigned (pruning never lowers it).
    highest: u64,
}

impl FileLog {
    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            events: BTreeMap::new(),
            highest: 0,
        }
    }

    /// Appends one event line and fsyncs.
    fn append(&self, event: &LogEvent) -> LogResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", encode_event(event)).as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Rewrites the whole file atomically (after pruning).
    fn rewrite(&self) -> LogResult<()> {
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        for event in self.events.values() {
            file.write_all(format!("{}\n", encode_event(event)).as_bytes())?;
        }
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// A persistent [`LogStore`] keeping one append-only line file per log.
///
/// # Thread Safety
///
/// As [`MemoryLogStore`](crate::MemoryLogStore): the outer map lock only
/// hands out per-log handles, each log serializes on its own mutex. The
/// `LOCK` file keeps a second process out entirely.
///
/// # Example
///
/// ```no_run
/// use fleetsync_log::{EventProperties, EventType, FileLogStore, LogStore};
/// use std::path::Path;
///
/// let store = FileLogStore::open(Path::new("audit"), true)?;
/// let log_id = store.create_log()?;
/// store.put(log_id, EventType::FRAMEWORK_STARTED, EventProperties::new())?;
/// # Ok::<(), fleetsync_log::LogError>(())
/// ```
#[derive(Debug)]
pub struct FileLogStore {
    root: PathBuf,
    logs: RwLock<HashMap<u64, Arc<Mutex<FileLog>>>>,
    /// Held for the lifetime of the store; released on drop.
    _lock_file: File,
}

impl FileLogStore {
    /// Opens or creates a log store directory, loading all logs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the directory doesn't exist and `create_if_missing` is false
    /// - another process holds the lock (returns [`LogError::Locked`])
    /// - a log file contains a malformed interior line
    ///   ([`LogError::Format`])
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> LogResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(LogError::format(format!(
                    "log store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(LogError::Locked {
                path: path.to_path_buf(),
            });
        }

        let logs_dir = path.join(LOGS_DIR);
        fs::create_dir_all(&logs_dir)?;

        let mut logs = HashMap::new();
        for entry in fs::read_dir(&logs_dir)? {
            let entry = entry?;
            let file_path = entry.path();
            let Some(log_id) = log_file_id(&file_path) else {
                warn!(path = %file_path.display(), "skipping unrecognized file in logs directory");
                continue;
            };
            let log = load_log(&file_path, log_id)?;
            logs.insert(log_id, Arc::new(Mutex::new(log)));
        }
        debug!(path = %path.display(), logs = logs.len(), "opened file log store");

        Ok(Self {
            root: path.to_path_buf(),
            logs: RwLock::new(logs),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn log_path(&self, log_id: u64) -> PathBuf {
        self.root.join(LOGS_DIR).join(format!("{log_id:016x}.{LOG_EXT}"))
    }

    fn log(&self, log_id: u64) -> Option<Arc<Mutex<FileLog>>> {
        self.logs.read().get(&log_id).cloned()
    }

    fn log_or_create(&self, log_id: u64) -> Arc<Mutex<FileLog>> {
        if let Some(log) = self.log(log_id) {
            return log;
        }
        let path = self.log_path(log_id);
        Arc::clone(
            self.logs
                .write()
                .entry(log_id)
                .or_insert_with(|| Arc::new(Mutex::new(FileLog::empty(path)))),
        )
    }
}

impl LogStore for FileLogStore {
    fn put(
        &self,
        log_id: u64,
        event_type: EventType,
        properties: EventProperties,
    ) -> LogResult<LogEvent> {
        let log = self.log_or_create(log_id);
        let mut log = log.lock();
        let event_id = log
            .highest
            .checked_add(1)
            .ok_or_else(|| LogError::format("event id space exhausted"))?;
        let event = LogEvent::new(log_id, event_id, event_type, now_ms(), properties);
        log.append(&event)?;
        log.events.insert(event_id, event.clone());
        log.highest = event_id;
        Ok(event)
    }

    fn insert(&self, event: &LogEvent) -> LogResult<bool> {
        if event.event_id == 0 {
            return Err(LogError::format("event id 0 is not assignable"));
        }
        let log = self.log_or_create(event.log_id);
        let mut log = log.lock();
        if log.events.contains_key(&event.event_id) {
            return Ok(false);
        }
        log.append(event)?;
        log.events.insert(event.event_id, event.clone());
        log.highest = log.highest.max(event.event_id);
        Ok(true)
    }

    fn events(&self, log_id: u64) -> LogResult<Vec<LogEvent>> {
        let log = self.log(log_id).ok_or(LogError::UnknownLog { log_id })?;
        let log = log.lock();
        Ok(log.events.values().cloned().collect())
    }

    fn events_in(&self, log_id: u64, from: u64, to: u64) -> LogResult<Vec<LogEvent>> {
        let log = self.log(log_id).ok_or(LogError::UnknownLog { log_id })?;
        let log = log.lock();
        if from > to {
            return Ok(Vec::new());
        }
        Ok(log.events.range(from..=to).map(|(_, e)| e.clone()).collect())
    }

    fn highest_id(&self, log_id: u64) -> LogResult<u64> {
        Ok(self.log(log_id).map_or(0, |log| log.lock().highest))
    }

    fn id_range(&self, log_id: u64) -> LogResult<RangeSet> {
        Ok(self.log(log_id).map_or_else(RangeSet::new, |log| {
            log.lock().events.keys().copied().collect()
        }))
    }

    fn log_ids(&self) -> LogResult<Vec<u64>> {
        let mut ids: Vec<u64> = self.logs.read().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn create_log(&self) -> LogResult<u64> {
        let mut logs = self.logs.write();
        let log_id = loop {
            let candidate: u64 = rand::random();
            if candidate != 0 && !logs.contains_key(&candidate) {
                break candidate;
            }
        };
        let path = self.log_path(log_id);
        // Create the (empty) file eagerly so the log survives a reopen.
        File::create(&path)?.sync_all()?;
        sync_directory(&self.root.join(LOGS_DIR))?;
        logs.insert(log_id, Arc::new(Mutex::new(FileLog::empty(path))));
        Ok(log_id)
    }

    fn prune(&self, log_id: u64, up_to: u64) -> LogResult<u64> {
        let log = self.log(log_id).ok_or(LogError::UnknownLog { log_id })?;
        let mut log = log.lock();
        let cutoff = up_to.min(log.highest.saturating_sub(1));
        let before = log.events.len();
        log.events.retain(|id, _| *id > cutoff);
        let removed = before - log.events.len();
        if removed > 0 {
            log.rewrite()?;
        }
        Ok(removed as u64)
    }
}

/// Parses `00000000000000ff.log` into `Some(255)`.
fn log_file_id(path: &Path) -> Option<u64> {
    if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    u64::from_str_radix(stem, 16).ok()
}

/// Loads one log file, repairing a torn final line.
fn load_log(path: &Path, log_id: u64) -> LogResult<FileLog> {
    let bytes = fs::read(path)?;

    // Complete lines end in '\n'; anything after the last newline is the
    // remains of an append that never finished.
    let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
    if keep < bytes.len() {
        warn!(
            log_id,
            dropped_bytes = bytes.len() - keep,
            "dropping torn final line of log file"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(keep as u64)?;
        file.sync_all()?;
    }

    let mut events = BTreeMap::new();
    let mut highest = 0u64;
    for line in bytes[..keep].split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let line = std::str::from_utf8(line)
            .map_err(|_| LogError::format(format!("log {log_id:#x} contains non-UTF-8 data")))?;
        let event = decode_event(line)?;
        if event.log_id != log_id {
            return Err(LogError::format(format!(
                "event for log {} found in file of log {}",
                event.log_id, log_id
            )));
        }
        highest = highest.max(event.event_id);
        events.insert(event.event_id, event);
    }

    Ok(FileLog {
        path: path.to_path_buf(),
        events,
        highest,
    })
}

/// Fsyncs a directory so file creations and renames in it are durable.
#[cfg(unix)]
fn sync_directory(path: &Path) -> LogResult<()> {
    let dir = File::open(path)?;
    dir.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> LogResult<()> {
    Ok(())
}
