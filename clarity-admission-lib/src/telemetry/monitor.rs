use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::security::{AdmissionController, MetricsSnapshot};

/// What one monitor tick observed.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    pub hour: String,
    pub snapshot: MetricsSnapshot,
    pub hour_requests: u64,
    pub blocked_ratio: f64,
    pub high_block_ratio: bool,
}

impl MonitorReport {
    pub fn collect(controller: &AdmissionController, threshold: f64, now: Instant) -> Self {
        let snapshot = controller.metrics_at(now);
        let hour = controller.hour_label(now);
        let hour_requests = snapshot.requests_in_hour(&hour);
        let blocked_ratio = snapshot.blocked_ratio();
        Self {
            hour,
            hour_requests,
            blocked_ratio,
            high_block_ratio: blocked_ratio > threshold,
            snapshot,
        }
    }

    fn log(&self) {
        info!(
            hour = %self.hour,
            total_requests = self.snapshot.total_requests,
            blocked_requests = self.snapshot.blocked_requests,
            unique_keys = self.snapshot.unique_keys_count,
            hour_requests = self.hour_requests,
            "admission summary"
        );
        if self.high_block_ratio {
            warn!(
                blocked_ratio = self.blocked_ratio,
                blocked_requests = self.snapshot.blocked_requests,
                total_requests = self.snapshot.total_requests,
                "high admission blocking ratio"
            );
        }
    }
}

/// Spawn the periodic admission summary.
///
/// The first summary is logged one `every` after start. The task ends when
/// `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_monitor(
    controller: Arc<AdmissionController>,
    every: Duration,
    high_block_ratio: f64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + every;
        let mut ticker = tokio::time::interval_at(start, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    MonitorReport::collect(&controller, high_block_ratio, Instant::now()).log();
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        debug!("admission monitor received shutdown");
                        break;
                    }
                }
            }
        }
    })
}
