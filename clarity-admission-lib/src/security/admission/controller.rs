use ahash::{AHashMap, RandomState};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::metrics::{AggregateMetrics, HourClock, MetricsSnapshot};
use super::window::RequestLog;
use super::{hash, AdmissionResult, BlockReason, ClientKey};
use crate::config::{validate_admission, AdmissionConfig};
use crate::error::{AdmissionError, Result};

/// Per-key state. The block entry and the history share one slot so that a
/// single shard lock covers the whole decision for a key.
#[derive(Debug, Default)]
struct KeyState {
    log: RequestLog,
    blocked_until: Option<Instant>,
}

type Shard = Mutex<AHashMap<ClientKey, KeyState>>;

/// Counts removed by one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// History entries that fell out of the window
    pub expired_requests: usize,
    /// Blocks whose cooldown had ended
    pub expired_blocks: usize,
    /// Keys left with no history and no block, removed entirely
    pub evicted_keys: usize,
}

impl SweepStats {
    pub fn is_empty(&self) -> bool {
        *self == SweepStats::default()
    }
}

/// Decides whether each request from a client key proceeds.
///
/// Keys are spread over a fixed number of shards; every decision for a key
/// runs under that key's shard lock, so concurrent checks for the same key
/// are linearizable and can never over-admit. Aggregate counters sit behind
/// their own lock, which is only taken after the shard lock is released.
///
/// # Example
/// ```ignore
/// use clarity_admission_lib::config::AdmissionConfig;
/// use clarity_admission_lib::security::admission::AdmissionController;
///
/// let controller = AdmissionController::new(AdmissionConfig::default())?;
/// match controller.check("203.0.113.7")? {
///     AdmissionResult::Allowed { remaining, .. } => println!("{remaining} left"),
///     AdmissionResult::Blocked { retry_after, .. } => println!("retry in {retry_after:?}"),
/// }
/// ```
pub struct AdmissionController {
    config: AdmissionConfig,
    window: Duration,
    block_duration: Duration,
    shards: Box<[Shard]>,
    hasher: RandomState,
    metrics: Mutex<AggregateMetrics>,
    clock: HourClock,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Result<Self> {
        Self::with_clock(config, HourClock::now())
    }

    /// Create a controller whose hour buckets are derived from `clock`.
    pub fn with_clock(config: AdmissionConfig, clock: HourClock) -> Result<Self> {
        validate_admission(&config)?;

        let shards = (0..config.shards)
            .map(|_| Mutex::new(AHashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let metrics = AggregateMetrics::new(config.metrics_reset_interval(), Instant::now());

        Ok(Self {
            window: config.window(),
            block_duration: config.block_duration(),
            config,
            shards,
            hasher: RandomState::new(),
            metrics: Mutex::new(metrics),
            clock,
        })
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Check a request arriving now.
    pub fn check(&self, key: &str) -> Result<AdmissionResult> {
        self.check_at(key, Instant::now())
    }

    /// Check a request arriving at `now`.
    ///
    /// Returns [`AdmissionError::InvalidKey`] for an empty key without
    /// touching any state.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<AdmissionResult> {
        if key.trim().is_empty() {
            return Err(AdmissionError::InvalidKey);
        }

        let (client_key, result) = {
            let mut shard = self.lock_shard(key);
            let client_key = match shard.get_key_value(key) {
                Some((existing, _)) => existing.clone(),
                None => ClientKey::new(key)?,
            };
            let state = shard.entry(client_key.clone()).or_default();
            let result = self.decide(state, now);
            (client_key, result)
        };

        if let AdmissionResult::Blocked { reason: BlockReason::Threshold, retry_after } = &result {
            warn!(
                key = %client_key,
                limit = self.config.max_requests,
                window_secs = self.config.window_seconds,
                retry_after_secs = retry_after.as_secs(),
                "client key reached its limit and is blocked"
            );
        }

        self.record_metrics(&client_key, now, result.is_blocked());
        Ok(result)
    }

    fn decide(&self, state: &mut KeyState, now: Instant) -> AdmissionResult {
        if let Some(until) = state.blocked_until {
            if until > now {
                return AdmissionResult::Blocked {
                    retry_after: until - now,
                    reason: BlockReason::Cooldown,
                };
            }
            state.blocked_until = None;
        }

        state.log.prune(now, self.window);
        let count = state.log.len();
        let limit = self.config.max_requests;

        if count >= limit as usize {
            state.blocked_until = Some(now + self.block_duration);
            state.log.clear();
            return AdmissionResult::Blocked {
                retry_after: self.block_duration,
                reason: BlockReason::Threshold,
            };
        }

        state.log.record(now);
        AdmissionResult::Allowed {
            limit,
            remaining: limit - count as u32 - 1,
            reset_at: now + self.window,
        }
    }

    fn record_metrics(&self, key: &ClientKey, now: Instant, blocked: bool) {
        let hour = self.clock.hour_label(now);
        let mut metrics = lock(&self.metrics);
        if metrics.reset_if_due(now) {
            info!("aggregate admission metrics reset");
        }
        metrics.record(key, hour, blocked);
    }

    /// Current aggregate counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics_at(Instant::now())
    }

    /// Aggregate counters as of `now`, applying a due reset first.
    pub fn metrics_at(&self, now: Instant) -> MetricsSnapshot {
        let mut metrics = lock(&self.metrics);
        if metrics.reset_if_due(now) {
            info!("aggregate admission metrics reset");
        }
        metrics.snapshot()
    }

    /// Apply a due metrics reset; returns whether one happened.
    pub fn reset_metrics_if_due(&self, now: Instant) -> bool {
        let reset = lock(&self.metrics).reset_if_due(now);
        if reset {
            info!("aggregate admission metrics reset");
        }
        reset
    }

    /// Evict expired history and expired blocks across all keys.
    ///
    /// Shards are swept one at a time so request handling on other shards is
    /// never stalled.
    pub fn sweep(&self, now: Instant) -> SweepStats {
        let mut stats = SweepStats::default();
        for shard in self.shards.iter() {
            let mut shard = lock(shard);
            shard.retain(|_, state| {
                stats.expired_requests += state.log.prune(now, self.window);
                if state.blocked_until.is_some_and(|until| until <= now) {
                    state.blocked_until = None;
                    stats.expired_blocks += 1;
                }
                let keep = !state.log.is_empty() || state.blocked_until.is_some();
                if !keep {
                    stats.evicted_keys += 1;
                }
                keep
            });
        }
        if !stats.is_empty() {
            debug!(
                expired_requests = stats.expired_requests,
                expired_blocks = stats.expired_blocks,
                evicted_keys = stats.evicted_keys,
                "admission sweep evicted stale state"
            );
        }
        stats
    }

    /// Number of keys holding history or a block.
    pub fn tracked_keys(&self) -> usize {
        self.shards.iter().map(|shard| lock(shard).len()).sum()
    }

    /// Number of keys cooling down at `now`.
    pub fn blocked_keys(&self, now: Instant) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                lock(shard)
                    .values()
                    .filter(|state| state.blocked_until.is_some_and(|until| until > now))
                    .count()
            })
            .sum()
    }

    /// Remaining cooldown for `key` at `now`, if it is blocked.
    pub fn block_remaining(&self, key: &str, now: Instant) -> Option<Duration> {
        let shard = self.lock_shard(key);
        shard
            .get(key)
            .and_then(|state| state.blocked_until)
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Admitted requests for `key` still inside the window at `now`.
    pub fn window_count(&self, key: &str, now: Instant) -> usize {
        let shard = self.lock_shard(key);
        shard.get(key).map_or(0, |state| {
            let mut log = state.log.clone();
            log.prune(now, self.window);
            log.len()
        })
    }

    pub fn hour_label(&self, now: Instant) -> String {
        self.clock.hour_label(now)
    }

    fn lock_shard(&self, key: &str) -> MutexGuard<'_, AHashMap<ClientKey, KeyState>> {
        let idx = (hash(key, &self.hasher) % self.shards.len() as u64) as usize;
        lock(&self.shards[idx])
    }
}

/// A poisoned lock still holds consistent state: every critical section
/// leaves its map valid before any call that could panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests: u32, window_seconds: u64, block_duration_seconds: u64) -> AdmissionConfig {
        AdmissionConfig {
            window_seconds,
            max_requests,
            block_duration_seconds,
            ..AdmissionConfig::default()
        }
    }

    fn controller(cfg: AdmissionConfig) -> AdmissionController {
        AdmissionController::new(cfg).unwrap_or_else(|e| panic!("invalid test config: {e}"))
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(AdmissionController::new(config(0, 60, 300)).is_err());
        assert!(AdmissionController::new(AdmissionConfig { shards: 0, ..config(3, 60, 300) })
            .is_err());
    }

    #[test]
    fn test_empty_key_leaves_state_untouched() {
        let controller = controller(config(3, 60, 300));
        let now = Instant::now();

        assert_eq!(controller.check_at("", now), Err(AdmissionError::InvalidKey));
        assert_eq!(controller.check_at(" \t", now), Err(AdmissionError::InvalidKey));
        assert_eq!(controller.tracked_keys(), 0);
        assert_eq!(controller.metrics_at(now).total_requests, 0);
    }

    #[test]
    fn test_threshold_request_is_not_recorded() -> Result<()> {
        let controller = controller(config(2, 60, 300));
        let start = Instant::now();

        controller.check_at("k", start)?;
        controller.check_at("k", start)?;
        assert_eq!(controller.window_count("k", start), 2);

        let result = controller.check_at("k", start)?;
        assert_eq!(result.block_reason(), Some(BlockReason::Threshold));
        // Placing the block starts the key over with an empty window.
        assert_eq!(controller.window_count("k", start), 0);
        Ok(())
    }

    #[test]
    fn test_blocked_requests_do_not_extend_cooldown() -> Result<()> {
        let controller = controller(config(1, 60, 300));
        let start = Instant::now();

        controller.check_at("k", start)?;
        controller.check_at("k", start)?;
        for secs in [10, 100, 250] {
            controller.check_at("k", start + Duration::from_secs(secs))?;
        }
        let remaining = controller.block_remaining("k", start + Duration::from_secs(299));
        assert_eq!(remaining, Some(Duration::from_secs(1)));
        assert_eq!(controller.block_remaining("k", start + Duration::from_secs(300)), None);
        Ok(())
    }

    #[test]
    fn test_expired_block_is_cleared_on_check() -> Result<()> {
        let controller = controller(config(1, 10, 20));
        let start = Instant::now();

        controller.check_at("k", start)?;
        assert!(controller.check_at("k", start)?.is_blocked());
        assert_eq!(controller.blocked_keys(start), 1);

        let after = start + Duration::from_secs(20);
        assert!(controller.check_at("k", after)?.is_allowed());
        assert_eq!(controller.blocked_keys(after), 0);
        Ok(())
    }

    #[test]
    fn test_sweep_stats() -> Result<()> {
        let controller = controller(config(1, 60, 300));
        let start = Instant::now();

        controller.check_at("idle", start)?;
        controller.check_at("abuser", start)?;
        controller.check_at("abuser", start)?;

        let stats = controller.sweep(start + Duration::from_secs(60));
        assert_eq!(stats, SweepStats { expired_requests: 1, expired_blocks: 0, evicted_keys: 1 });
        assert_eq!(controller.tracked_keys(), 1);

        let stats = controller.sweep(start + Duration::from_secs(300));
        assert_eq!(stats, SweepStats { expired_requests: 0, expired_blocks: 1, evicted_keys: 1 });
        assert_eq!(controller.tracked_keys(), 0);
        Ok(())
    }

    #[test]
    fn test_single_shard_still_isolates_keys() -> Result<()> {
        let controller = controller(AdmissionConfig { shards: 1, ..config(1, 60, 300) });
        let now = Instant::now();

        assert!(controller.check_at("a", now)?.is_allowed());
        assert!(controller.check_at("b", now)?.is_allowed());
        assert!(controller.check_at("a", now)?.is_blocked());
        assert_eq!(controller.block_remaining("b", now), None);
        Ok(())
    }
}
