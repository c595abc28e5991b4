//! Configuration for the sync engine.

use std::time::Duration;

/// Which way events flow during a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncDirection {
    /// Only fetch events the peer has and we lack.
    Pull,
    /// Only send events we have and the peer lacks.
    Push,
    /// Pull first, then push.
    #[default]
    PushPull,
}

impl SyncDirection {
    /// Whether a cycle in this direction fetches from the peer.
    #[must_use]
    pub fn pulls(&self) -> bool {
        matches!(self, SyncDirection::Pull | SyncDirection::PushPull)
    }

    /// Whether a cycle in this direction sends to the peer.
    #[must_use]
    pub fn pushes(&self) -> bool {
        matches!(self, SyncDirection::Push | SyncDirection::PushPull)
    }
}

/// Configuration for sync cycles.
///
/// The engine treats a config as immutable: changing settings means
/// building a new value and swapping it in whole with
/// [`LogSync::reconfigure`](crate::LogSync::reconfigure). A running cycle
/// keeps the config it started with.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Transfer direction for each cycle.
    pub direction: SyncDirection,
    /// Maximum events per transferred batch.
    pub batch_size: u32,
    /// Upper bound on rounds for fixed-point syncing.
    pub max_rounds: u32,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration with the given direction and defaults
    /// elsewhere.
    #[must_use]
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            batch_size: 500,
            max_rounds: 8,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the fixed-point round bound.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(SyncDirection::PushPull)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter, making delays deterministic.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX));

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter spreads retry storms apart.
            let jitter = delay_secs * 0.25 * rand::random::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_predicates() {
        assert!(SyncDirection::Pull.pulls());
        assert!(!SyncDirection::Pull.pushes());
        assert!(SyncDirection::Push.pushes());
        assert!(!SyncDirection::Push.pulls());
        assert!(SyncDirection::PushPull.pulls());
        assert!(SyncDirection::PushPull.pushes());
    }

    #[test]
    fn test_sync_config_builder() {
        let config = SyncConfig::new(SyncDirection::Pull)
            .with_batch_size(50)
            .with_max_rounds(3);
        assert_eq!(config.direction, SyncDirection::Pull);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_rounds, 3);
    }

    #[test]
    fn test_retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn test_retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn test_retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250));
    }

    #[test]
    fn test_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(4)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .without_jitter();

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }
}
