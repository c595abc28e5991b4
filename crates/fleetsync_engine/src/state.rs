//! Sync engine state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{EngineError, EngineResult};
use crate::transport::LogTransport;
use fleetsync_log::LogStore;
use fleetsync_protocol::{delta, EventBatch, LogDescriptor, QueryRequest, ReceiveRequest};
use fleetsync_rangeset::RangeSet;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is fetching the peer's log descriptors.
    Querying,
    /// Engine is fetching missing events from the peer.
    Pulling,
    /// Engine is sending events the peer is missing.
    Pushing,
    /// Engine has completed a sync cycle.
    Synced,
    /// Engine encountered an error.
    Error,
    /// Engine is waiting before retrying.
    RetryWait,
}

impl SyncState {
    /// Returns true if the engine is in an active sync state.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Querying | SyncState::Pulling | SyncState::Pushing
        )
    }

    /// Returns true if the engine can start a new sync.
    #[must_use]
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Synced | SyncState::Error)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of events pulled.
    pub events_pulled: u64,
    /// Total number of events pushed.
    pub events_pushed: u64,
    /// Total number of duplicate events skipped on either side.
    pub events_ignored: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Number of events pulled.
    pub pulled: u64,
    /// Number of events pushed.
    pub pushed: u64,
    /// Number of duplicates skipped on either side.
    pub ignored: u64,
    /// Whether the sync was successful.
    pub success: bool,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

impl SyncCycleResult {
    fn empty() -> Self {
        Self {
            pulled: 0,
            pushed: 0,
            ignored: 0,
            success: false,
            duration: Duration::ZERO,
        }
    }

    /// Whether the cycle moved no events in either direction.
    #[must_use]
    pub fn is_fixed_point(&self) -> bool {
        self.pulled == 0 && self.pushed == 0
    }
}

/// The sync engine replicates event logs between a local store and a peer.
///
/// One [`sync`](LogSync::sync) cycle queries the peer's descriptors once,
/// then transfers only events one side is missing, in the direction the
/// configuration selects. Pull runs before push, so events fetched in this
/// cycle are never offered straight back to the peer that sent them.
pub struct LogSync<T: LogTransport> {
    config: RwLock<Arc<SyncConfig>>,
    transport: Arc<T>,
    store: Arc<dyn LogStore>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<T: LogTransport> LogSync<T> {
    /// Creates a new sync engine over a local store and a peer transport.
    pub fn new(config: SyncConfig, transport: T, store: Arc<dyn LogStore>) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            transport: Arc::new(transport),
            store,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The configuration cycles currently run with.
    pub fn config(&self) -> Arc<SyncConfig> {
        Arc::clone(&self.config.read())
    }

    /// Replaces the configuration as a whole.
    ///
    /// A cycle already underway keeps the configuration it started with;
    /// the next cycle picks up the new one.
    pub fn reconfigure(&self, config: SyncConfig) {
        *self.config.write() = Arc::new(config);
    }

    /// Cancels any ongoing sync operation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Performs one sync cycle.
    ///
    /// # Errors
    ///
    /// Transport, protocol and store failures abort the cycle; the engine
    /// lands in [`SyncState::Error`] and can be synced again. A cycle
    /// requested while one is active is [`EngineError::InvalidState`].
    pub fn sync(&self) -> EngineResult<SyncCycleResult> {
        let start = Instant::now();
        self.reset_cancel();

        if !self.state().can_start_sync() {
            return Err(EngineError::InvalidState {
                from: format!("{:?}", self.state()),
                to: "sync".into(),
            });
        }
        let config = self.config();
        let mut result = SyncCycleResult::empty();

        self.set_state(SyncState::Querying);
        let peer = match self.transport.query(&QueryRequest::all()) {
            Ok(response) => response.descriptors,
            Err(e) => {
                self.handle_error(&e);
                return Err(e);
            }
        };

        if config.direction.pulls() {
            self.set_state(SyncState::Pulling);
            match self.pull_missing(&peer, &config) {
                Ok((pulled, ignored)) => {
                    result.pulled = pulled;
                    result.ignored += ignored;
                }
                Err(e) => {
                    self.handle_error(&e);
                    result.duration = start.elapsed();
                    return Err(e);
                }
            }
        }

        if config.direction.pushes() {
            self.set_state(SyncState::Pushing);
            match self.push_missing(&peer, &config) {
                Ok((pushed, ignored)) => {
                    result.pushed = pushed;
                    result.ignored += ignored;
                }
                Err(e) => {
                    self.handle_error(&e);
                    result.duration = start.elapsed();
                    return Err(e);
                }
            }
        }

        result.success = true;
        result.duration = start.elapsed();
        self.set_state(SyncState::Synced);
        debug!(
            pulled = result.pulled,
            pushed = result.pushed,
            ignored = result.ignored,
            "sync cycle complete"
        );

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.events_pulled += result.pulled;
            stats.events_pushed += result.pushed;
            stats.events_ignored += result.ignored;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }

        Ok(result)
    }

    /// Repeats sync cycles until one moves no events in either direction.
    ///
    /// Two honest peers converge in at most two cycles; the configured
    /// `max_rounds` bounds the attempt against a peer that keeps growing.
    ///
    /// # Errors
    ///
    /// Everything [`sync`](LogSync::sync) can fail with, plus
    /// [`EngineError::FixedPointNotReached`] when the round bound runs out.
    pub fn sync_to_fixed_point(&self) -> EngineResult<SyncCycleResult> {
        let start = Instant::now();
        let rounds = self.config().max_rounds.max(1);
        let mut aggregate = SyncCycleResult::empty();

        for _ in 0..rounds {
            let result = self.sync()?;
            aggregate.pulled += result.pulled;
            aggregate.pushed += result.pushed;
            aggregate.ignored += result.ignored;
            if result.is_fixed_point() {
                aggregate.success = true;
                aggregate.duration = start.elapsed();
                return Ok(aggregate);
            }
        }

        Err(EngineError::FixedPointNotReached { rounds })
    }

    /// Performs a sync with retry on transient errors.
    ///
    /// # Errors
    ///
    /// The last error once attempts are exhausted; non-retryable errors
    /// immediately.
    pub fn sync_with_retry(&self) -> EngineResult<SyncCycleResult> {
        let config = self.config();
        let retry = &config.retry;
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                self.set_state(SyncState::RetryWait);
                let delay = retry.delay_for_attempt(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "sync retry");
                std::thread::sleep(delay);

                self.stats.write().retries += 1;
            }

            if let Err(e) = self.check_cancelled() {
                self.handle_error(&e);
                return Err(e);
            }

            match self.sync() {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() && attempt + 1 < retry.max_attempts {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| EngineError::transport_fatal("no sync attempts made")))
    }

    /// One descriptor per locally held log.
    fn local_descriptors(&self) -> EngineResult<Vec<LogDescriptor>> {
        let mut descriptors = Vec::new();
        for log_id in self.store.log_ids()? {
            descriptors.push(LogDescriptor::new(log_id, self.store.id_range(log_id)?));
        }
        Ok(descriptors)
    }

    /// Fetches and applies everything the peer holds that we lack.
    fn pull_missing(
        &self,
        peer: &[LogDescriptor],
        config: &SyncConfig,
    ) -> EngineResult<(u64, u64)> {
        let local = self.local_descriptors()?;
        let plan = delta(&local, peer);
        let mut pulled = 0u64;
        let mut ignored = 0u64;

        for descriptor in plan {
            for chunk in chunk_ranges(&descriptor.ranges, config.batch_size) {
                self.check_cancelled()?;
                let batch = self
                    .transport
                    .receive(&ReceiveRequest::for_ranges(descriptor.log_id, chunk))?;
                for event in &batch.events {
                    if self.store.insert(event)? {
                        pulled += 1;
                    } else {
                        ignored += 1;
                    }
                }
            }
        }

        Ok((pulled, ignored))
    }

    /// Sends everything we hold that the peer lacks.
    fn push_missing(
        &self,
        peer: &[LogDescriptor],
        config: &SyncConfig,
    ) -> EngineResult<(u64, u64)> {
        let local = self.local_descriptors()?;
        let plan = delta(peer, &local);
        let mut pushed = 0u64;
        let mut ignored = 0u64;

        for descriptor in plan {
            for chunk in chunk_ranges(&descriptor.ranges, config.batch_size) {
                self.check_cancelled()?;
                let mut events = Vec::new();
                for range in chunk.ranges() {
                    events.extend(self.store.events_in(
                        descriptor.log_id,
                        range.low(),
                        range.high(),
                    )?);
                }
                if events.is_empty() {
                    continue;
                }
                let response = self.transport.send(&EventBatch::new(events))?;
                pushed += response.accepted;
                ignored += response.ignored;
            }
        }

        Ok((pushed, ignored))
    }

    fn handle_error(&self, error: &EngineError) {
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}

/// Splits an id set into consecutive chunks of at most `batch_size` ids.
fn chunk_ranges(ranges: &RangeSet, batch_size: u32) -> Vec<RangeSet> {
    let limit = batch_size.max(1) as usize;
    let mut chunks = Vec::new();
    let mut current = RangeSet::new();
    let mut count = 0usize;

    for id in ranges.iter() {
        current.add(id);
        count += 1;
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, SyncDirection};
    use crate::transport::LoopbackTransport;
    use fleetsync_log::{EventProperties, EventType, LogEvent, MemoryLogStore};
    use fleetsync_protocol::{QueryResponse, SendResponse};
    use std::sync::atomic::AtomicUsize;

    fn seed(store: &MemoryLogStore, log_id: u64, ids: &[u64]) {
        for &id in ids {
            store
                .insert(&LogEvent::new(
                    log_id,
                    id,
                    EventType::BUNDLE_INSTALLED,
                    1000 + id,
                    EventProperties::new(),
                ))
                .unwrap();
        }
    }

    fn engine_between(
        local: &Arc<MemoryLogStore>,
        remote: &Arc<MemoryLogStore>,
        config: SyncConfig,
    ) -> LogSync<LoopbackTransport> {
        let transport = LoopbackTransport::new(Arc::clone(remote) as Arc<dyn LogStore>);
        LogSync::new(config, transport, Arc::clone(local) as Arc<dyn LogStore>)
    }

    /// Delegates to a loopback peer, failing the first `failures` queries.
    struct FlakyTransport {
        inner: LoopbackTransport,
        failures: AtomicUsize,
        retryable: bool,
    }

    impl FlakyTransport {
        fn new(store: Arc<dyn LogStore>, failures: usize, retryable: bool) -> Self {
            Self {
                inner: LoopbackTransport::new(store),
                failures: AtomicUsize::new(failures),
                retryable,
            }
        }
    }

    impl LogTransport for FlakyTransport {
        fn query(&self, request: &QueryRequest) -> EngineResult<QueryResponse> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(if self.retryable {
                    EngineError::transport_retryable("connection reset")
                } else {
                    EngineError::transport_fatal("bad certificate")
                });
            }
            self.inner.query(request)
        }

        fn receive(&self, request: &ReceiveRequest) -> EngineResult<EventBatch> {
            self.inner.receive(request)
        }

        fn send(&self, batch: &EventBatch) -> EngineResult<SendResponse> {
            self.inner.send(batch)
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn close(&self) -> EngineResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sync_state_checks() {
        assert!(SyncState::Idle.can_start_sync());
        assert!(SyncState::Synced.can_start_sync());
        assert!(SyncState::Error.can_start_sync());
        assert!(!SyncState::Pulling.can_start_sync());
        assert!(!SyncState::Pushing.can_start_sync());

        assert!(SyncState::Querying.is_active());
        assert!(SyncState::Pulling.is_active());
        assert!(SyncState::Pushing.is_active());
        assert!(!SyncState::Idle.is_active());
        assert!(!SyncState::RetryWait.is_active());
    }

    #[test]
    fn test_initial_state() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        let engine = engine_between(&local, &remote, SyncConfig::default());

        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.stats().cycles_completed, 0);
    }

    #[test]
    fn test_push_pull_reaches_union() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2, 3, 5]);
        seed(&remote, 1, &[1, 2, 4]);

        let engine = engine_between(&local, &remote, SyncConfig::default());
        let result = engine.sync().unwrap();

        assert!(result.success);
        assert_eq!(result.pulled, 1);
        assert_eq!(result.pushed, 2);
        assert_eq!(result.ignored, 0);
        assert_eq!(local.id_range(1).unwrap().to_string(), "1-5");
        assert_eq!(remote.id_range(1).unwrap().to_string(), "1-5");
        assert_eq!(engine.state(), SyncState::Synced);
        assert_eq!(engine.stats().cycles_completed, 1);
    }

    #[test]
    fn test_second_cycle_is_fixed_point() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2, 3, 5]);
        seed(&remote, 1, &[1, 2, 4]);

        let engine = engine_between(&local, &remote, SyncConfig::default());
        engine.sync().unwrap();
        let second = engine.sync().unwrap();
        assert!(second.is_fixed_point());
        assert_eq!(second.ignored, 0);
    }

    #[test]
    fn test_sync_to_fixed_point_aggregates() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2, 3, 5]);
        seed(&remote, 1, &[1, 2, 4]);

        let engine = engine_between(&local, &remote, SyncConfig::default());
        let result = engine.sync_to_fixed_point().unwrap();
        assert!(result.success);
        assert_eq!(result.pulled, 1);
        assert_eq!(result.pushed, 2);
    }

    #[test]
    fn test_pull_only_leaves_peer_unchanged() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2, 3, 5]);
        seed(&remote, 1, &[1, 2, 4]);

        let engine = engine_between(&local, &remote, SyncConfig::new(SyncDirection::Pull));
        let result = engine.sync().unwrap();

        assert_eq!(result.pulled, 1);
        assert_eq!(result.pushed, 0);
        assert_eq!(local.id_range(1).unwrap().to_string(), "1-5");
        assert_eq!(remote.id_range(1).unwrap().to_string(), "1-2,4");
    }

    #[test]
    fn test_push_only_leaves_local_unchanged() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2, 3, 5]);
        seed(&remote, 1, &[1, 2, 4]);

        let engine = engine_between(&local, &remote, SyncConfig::new(SyncDirection::Push));
        let result = engine.sync().unwrap();

        assert_eq!(result.pulled, 0);
        assert_eq!(result.pushed, 2);
        assert_eq!(local.id_range(1).unwrap().to_string(), "1-3,5");
        assert_eq!(remote.id_range(1).unwrap().to_string(), "1-5");
    }

    #[test]
    fn test_multiple_logs_converge() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2]);
        seed(&remote, 1, &[3]);
        seed(&remote, 9, &[1, 2, 3]);

        let engine = engine_between(&local, &remote, SyncConfig::default());
        let result = engine.sync().unwrap();

        // Log 9 was entirely unknown locally and is copied whole.
        assert_eq!(result.pulled, 4);
        assert_eq!(result.pushed, 2);
        assert_eq!(local.id_range(9).unwrap().to_string(), "1-3");
        assert_eq!(remote.id_range(1).unwrap().to_string(), "1-3");
    }

    #[test]
    fn test_small_batches_still_converge() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&remote, 1, &[1, 2, 3, 4, 5, 6, 7]);

        let config = SyncConfig::default().with_batch_size(2);
        let engine = engine_between(&local, &remote, config);
        let result = engine.sync().unwrap();

        assert_eq!(result.pulled, 7);
        assert_eq!(local.id_range(1).unwrap().to_string(), "1-7");
    }

    #[test]
    fn test_idempotent_reapply_counts_ignored() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1, 2]);
        seed(&remote, 1, &[1, 2, 3]);

        let transport = LoopbackTransport::new(Arc::clone(&remote) as Arc<dyn LogStore>);
        let engine = LogSync::new(
            SyncConfig::new(SyncDirection::Push),
            transport,
            Arc::clone(&local) as Arc<dyn LogStore>,
        );

        // The peer holds a superset, so a planned push moves nothing.
        let result = engine.sync().unwrap();
        assert_eq!(result.pushed, 0);

        // An unplanned resend of held ids is ignored, not an error.
        let batch = EventBatch::new(local.events(1).unwrap());
        let response = LoopbackTransport::new(Arc::clone(&remote) as Arc<dyn LogStore>)
            .send(&batch)
            .unwrap();
        assert_eq!(response.accepted, 0);
        assert_eq!(response.ignored, 2);
    }

    #[test]
    fn test_retry_succeeds_after_transient_failures() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&remote, 1, &[1, 2, 3]);

        let transport = FlakyTransport::new(Arc::clone(&remote) as Arc<dyn LogStore>, 2, true);
        let retry = RetryConfig::new(3)
            .with_initial_delay(Duration::from_millis(1))
            .without_jitter();
        let engine = LogSync::new(
            SyncConfig::default().with_retry(retry),
            transport,
            Arc::clone(&local) as Arc<dyn LogStore>,
        );

        let result = engine.sync_with_retry().unwrap();
        assert_eq!(result.pulled, 3);
        assert_eq!(engine.stats().retries, 2);
    }

    #[test]
    fn test_retry_gives_up_on_fatal_error() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());

        let transport = FlakyTransport::new(Arc::clone(&remote) as Arc<dyn LogStore>, 1, false);
        let retry = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(1))
            .without_jitter();
        let engine = LogSync::new(
            SyncConfig::default().with_retry(retry),
            transport,
            Arc::clone(&local) as Arc<dyn LogStore>,
        );

        assert!(engine.sync_with_retry().is_err());
        assert_eq!(engine.stats().retries, 0);
        assert_eq!(engine.state(), SyncState::Error);
        assert!(engine.stats().last_error.is_some());
    }

    #[test]
    fn test_reconfigure_takes_effect_next_cycle() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        seed(&local, 1, &[1]);
        seed(&remote, 1, &[2]);

        let engine = engine_between(&local, &remote, SyncConfig::new(SyncDirection::Pull));
        engine.sync().unwrap();
        assert_eq!(remote.id_range(1).unwrap().to_string(), "2");

        engine.reconfigure(SyncConfig::new(SyncDirection::PushPull));
        assert_eq!(engine.config().direction, SyncDirection::PushPull);
        engine.sync().unwrap();
        assert_eq!(remote.id_range(1).unwrap().to_string(), "1-2");
    }

    #[test]
    fn test_cancel_flag_round_trip() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        let engine = engine_between(&local, &remote, SyncConfig::default());

        engine.cancel();
        assert!(matches!(
            engine.check_cancelled(),
            Err(EngineError::Cancelled)
        ));
        engine.reset_cancel();
        assert!(engine.check_cancelled().is_ok());
    }

    #[test]
    fn test_chunk_ranges_splits_by_count() {
        let ranges = RangeSet::parse("1-5,8-9").unwrap();
        let chunks = chunk_ranges(&ranges, 3);
        let rendered: Vec<String> = chunks.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["1-3", "4-5,8", "9"]);

        assert!(chunk_ranges(&RangeSet::new(), 3).is_empty());
        assert_eq!(chunk_ranges(&ranges, 100).len(), 1);
    }

    #[test]
    fn test_empty_stores_fixed_point_immediately() {
        let local = Arc::new(MemoryLogStore::new());
        let remote = Arc::new(MemoryLogStore::new());
        let engine = engine_between(&local, &remote, SyncConfig::default());

        let result = engine.sync_to_fixed_point().unwrap();
        assert!(result.success);
        assert!(result.is_fixed_point());
    }
}
