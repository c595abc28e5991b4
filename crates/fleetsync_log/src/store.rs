//! The log store trait.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::LogResult;
use crate::event::{EventProperties, EventType, LogEvent};
use fleetsync_rangeset::RangeSet;

/// A store of append-only event logs, one per `log_id`.
///
/// Logs come into existence on first use (`put`, `insert`, or
/// [`create_log`](LogStore::create_log)) and are never removed by the store
/// itself; [`prune`](LogStore::prune) is the explicit administrative
/// trimming operation, and even it always retains the newest event so id
/// assignment can never reuse an id.
///
/// # Thread Safety
///
/// Id assignment is atomic per log: concurrent `put`s for one `log_id`
/// observe strictly increasing, gap-free ids. Puts for different logs
/// proceed in parallel.
///
/// # Lenient vs strict lookups
///
/// The replication protocol probes logs the peer may not have yet, so the
/// descriptor-side queries are lenient: [`highest_id`](LogStore::highest_id)
/// answers 0 and [`id_range`](LogStore::id_range) an empty set for unknown
/// logs. Reading events ([`events`](LogStore::events),
/// [`events_in`](LogStore::events_in)) from an unknown log is a caller
/// error: [`LogError::UnknownLog`](crate::LogError::UnknownLog).
pub trait LogStore: Send + Sync {
    /// Appends a new event: assigns the next id (highest + 1, or 1 for a
    /// fresh log), stamps the current time, persists, and returns the
    /// created event.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn put(
        &self,
        log_id: u64,
        event_type: EventType,
        properties: EventProperties,
    ) -> LogResult<LogEvent>;

    /// Applies a replicated event, keeping the id its origin assigned.
    ///
    /// Returns `false` (and changes nothing) when that id is already
    /// present for the log — the idempotence that makes replication safe
    /// to abort and rerun.
    ///
    /// # Errors
    ///
    /// [`LogError::Format`](crate::LogError::Format) for event id 0;
    /// storage failures otherwise.
    fn insert(&self, event: &LogEvent) -> LogResult<bool>;

    /// All events of a log, ascending by id.
    ///
    /// # Errors
    ///
    /// [`LogError::UnknownLog`](crate::LogError::UnknownLog) when the store
    /// has never seen `log_id`.
    fn events(&self, log_id: u64) -> LogResult<Vec<LogEvent>>;

    /// Events with `from <= event_id <= to`, ascending. Inverted bounds
    /// yield an empty result.
    ///
    /// # Errors
    ///
    /// [`LogError::UnknownLog`](crate::LogError::UnknownLog) when the store
    /// has never seen `log_id`.
    fn events_in(&self, log_id: u64, from: u64, to: u64) -> LogResult<Vec<LogEvent>>;

    /// Highest id ever assigned in a log; 0 for an empty or unknown log.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn highest_id(&self, log_id: u64) -> LogResult<u64>;

    /// The set of event ids currently held for a log (possibly sparse
    /// after pruning or partial replication); empty for unknown logs.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn id_range(&self, log_id: u64) -> LogResult<RangeSet>;

    /// All known log ids, ascending.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn log_ids(&self) -> LogResult<Vec<u64>>;

    /// Mints a fresh random non-zero log id and registers the empty log.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    fn create_log(&self) -> LogResult<u64>;

    /// Removes events with `id <= min(up_to, highest - 1)` — the newest
    /// event always survives. Returns the number removed.
    ///
    /// # Errors
    ///
    /// [`LogError::UnknownLog`](crate::LogError::UnknownLog) when the store
    /// has never seen `log_id`.
    fn prune(&self, log_id: u64, up_to: u64) -> LogResult<u64>;
}

/// Wall-clock milliseconds since the Unix epoch, for event timestamps.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
