use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::AdmissionController;
use crate::telemetry::Metrics;

/// Spawn the periodic sweep of expired history and blocks.
///
/// Each tick also applies a due aggregate-metrics reset. The task ends when
/// `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_sweeper(
    controller: Arc<AdmissionController>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
    metrics: Option<Arc<Metrics>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "admission sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let stats = controller.sweep(now);
                    controller.reset_metrics_if_due(now);
                    if let Some(m) = &metrics {
                        m.record_sweep(&stats);
                        m.set_tracked_keys(controller.tracked_keys());
                    }
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        debug!("admission sweeper received shutdown");
                        break;
                    }
                }
            }
        }

        info!("admission sweeper stopped");
    })
}
