//! In-memory log store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{LogError, LogResult};
use crate::event::{EventProperties, EventType, LogEvent};
use crate::store::{now_ms, LogStore};
use fleetsync_rangeset::RangeSet;

/// One log's state, behind its own lock.
#[derive(Debug, Default)]
struct EventLog {
    events: BTreeMap<u64, LogEvent>,
    /// Highest id ever assigned (monotonic; pruning never lowers it).
    highest: u64,
}

impl EventLog {
    fn id_range(&self) -> RangeSet {
        self.events.keys().copied().collect()
    }
}

/// An in-memory [`LogStore`].
///
/// # Thread Safety
///
/// The outer map lock is held only to fetch a log's handle; each log then
/// serializes on its own mutex, so puts for different logs run in
/// parallel while id assignment stays atomic per log.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: RwLock<HashMap<u64, Arc<Mutex<EventLog>>>>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a log's handle, or `None` if the store has never seen it.
    fn log(&self, log_id: u64) -> Option<Arc<Mutex<EventLog>>> {
        self.logs.read().get(&log_id).cloned()
    }

    /// Fetches a log's handle, registering the log on first use.
    fn log_or_create(&self, log_id: u64) -> Arc<Mutex<EventLog>> {
        if let Some(log) = self.log(log_id) {
            return log;
        }
        Arc::clone(
            self.logs
                .write()
                .entry(log_id)
                .or_insert_with(Arc::default),
        )
    }
}

impl LogStore for MemoryLogStore {
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
        Ok(self
            .log(log_id)
            .map_or_else(RangeSet::new, |log| log.lock().id_range()))
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
        logs.insert(log_id, Arc::default());
        Ok(log_id)
    }

    fn prune(&self, log_id: u64, up_to: u64) -> LogResult<u64> {
        let log = self.log(log_id).ok_or(LogError::UnknownLog { log_id })?;
        let mut log = log.lock();
        let cutoff = up_to.min(log.highest.saturating_sub(1));
        let before = log.events.len();
        log.events.retain(|id, _| *id > cutoff);
        Ok((before - log.events.len()) as u64)
    }
}
