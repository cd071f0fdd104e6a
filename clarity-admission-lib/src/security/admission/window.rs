//! Per-key sliding-window request history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Chronological instants of the requests a key had admitted.
///
/// An entry counts while its age is strictly below the window; once
/// `now - entry >= window` it is expired and removed by [`RequestLog::prune`].
#[derive(Debug, Default, Clone)]
pub struct RequestLog {
    hits: VecDeque<Instant>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an admitted request.
    ///
    /// Entries never go backwards: a `now` older than the newest entry is
    /// recorded at the newest entry's instant.
    pub fn record(&mut self, now: Instant) {
        let at = match self.hits.back() {
            Some(last) if *last > now => *last,
            _ => now,
        };
        self.hits.push_back(at);
    }

    /// Drop entries that fell out of the window ending at `now`.
    ///
    /// Returns how many entries were removed.
    pub fn prune(&mut self, now: Instant, window: Duration) -> usize {
        let mut removed = 0;
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) < window {
                break;
            }
            self.hits.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}
