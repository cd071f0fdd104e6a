//! Aggregate admission counters with a periodic reset.

use ahash::AHashSet;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::ClientKey;

/// Hour bucket label format, e.g. `2026-10-14 09:00`
pub const HOUR_LABEL_FORMAT: &str = "%Y-%m-%d %H:00";

/// Read-only copy of the aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub unique_keys_count: usize,
    pub hourly_stats: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Share of requests that were blocked, 0.0 when nothing was seen.
    pub fn blocked_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.blocked_requests as f64 / self.total_requests as f64
    }

    pub fn requests_in_hour(&self, label: &str) -> u64 {
        self.hourly_stats.get(label).copied().unwrap_or(0)
    }
}

/// Maps monotonic instants onto UTC wall-clock hour labels.
///
/// Anchored once so that injected instants in tests produce stable labels.
#[derive(Debug, Clone, Copy)]
pub struct HourClock {
    instant: Instant,
    wall: DateTime<Utc>,
}

impl HourClock {
    pub fn new(instant: Instant, wall: DateTime<Utc>) -> Self {
        Self { instant, wall }
    }

    pub fn now() -> Self {
        Self::new(Instant::now(), Utc::now())
    }

    /// Wall-clock time of `at`, which may lie before or after the anchor.
    pub fn wall_time(&self, at: Instant) -> DateTime<Utc> {
        let shifted = match at.checked_duration_since(self.instant) {
            Some(ahead) => TimeDelta::from_std(ahead)
                .ok()
                .and_then(|delta| self.wall.checked_add_signed(delta)),
            None => TimeDelta::from_std(self.instant.duration_since(at))
                .ok()
                .and_then(|delta| self.wall.checked_sub_signed(delta)),
        };
        shifted.unwrap_or(self.wall)
    }

    pub fn hour_label(&self, at: Instant) -> String {
        self.wall_time(at).format(HOUR_LABEL_FORMAT).to_string()
    }
}

#[derive(Debug)]
pub(crate) struct AggregateMetrics {
    total_requests: u64,
    blocked_requests: u64,
    unique_keys: AHashSet<ClientKey>,
    hourly_stats: BTreeMap<String, u64>,
    last_reset: Instant,
    reset_interval: Duration,
}

impl AggregateMetrics {
    pub(crate) fn new(reset_interval: Duration, now: Instant) -> Self {
        Self {
            total_requests: 0,
            blocked_requests: 0,
            unique_keys: AHashSet::new(),
            hourly_stats: BTreeMap::new(),
            last_reset: now,
            reset_interval,
        }
    }

    /// Zero every counter if more than the reset interval has passed.
    pub(crate) fn reset_if_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_reset) <= self.reset_interval {
            return false;
        }
        self.total_requests = 0;
        self.blocked_requests = 0;
        self.unique_keys.clear();
        self.hourly_stats.clear();
        self.last_reset = now;
        true
    }

    pub(crate) fn record(&mut self, key: &ClientKey, hour: String, blocked: bool) {
        self.total_requests += 1;
        if blocked {
            self.blocked_requests += 1;
        }
        if !self.unique_keys.contains(key.as_str()) {
            self.unique_keys.insert(key.clone());
        }
        *self.hourly_stats.entry(hour).or_insert(0) += 1;
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests,
            blocked_requests: self.blocked_requests,
            unique_keys_count: self.unique_keys.len(),
            hourly_stats: self.hourly_stats.clone(),
        }
    }
}
