//! Wiring of the gate and its background tasks into one run.

use std::future::Future;
use std::sync::Arc;

use prometheus::Registry;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::gate::{self, GateState};
use crate::security::admission::spawn_sweeper;
use crate::security::AdmissionController;
use crate::telemetry::{spawn_monitor, start_observability_server, Metrics};

/// Run the gate with its sweeper, monitor and optional observability server.
///
/// Returns once `signal` completes or the gate itself stops. Either way every
/// background task is told to shut down and joined, so a gate that fails to
/// bind returns its error instead of leaving the tasks running.
pub async fn run_service<S>(
    cfg: &Config,
    controller: Arc<AdmissionController>,
    metrics: Option<Arc<Metrics>>,
    registry: Option<Registry>,
    signal: S,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = spawn_sweeper(
        controller.clone(),
        cfg.admission.sweep_interval(),
        shutdown_rx.clone(),
        metrics.clone(),
    );
    let monitor = spawn_monitor(
        controller.clone(),
        cfg.monitor.interval(),
        cfg.monitor.high_block_ratio,
        shutdown_rx.clone(),
    );

    let observability = match (cfg.telemetry.metrics_port, registry) {
        (Some(port), Some(registry)) => {
            let controller = controller.clone();
            let shutdown = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(err) =
                    start_observability_server(port, registry, controller, shutdown).await
                {
                    error!(%err, "observability server exited with error");
                }
            }))
        }
        _ => None,
    };

    let state = Arc::new(GateState::new(controller, cfg.key.clone(), metrics));
    let gate = gate::run(cfg.listen, state, shutdown_rx);
    tokio::pin!(gate);

    let result = tokio::select! {
        res = &mut gate => res,
        () = signal => {
            info!("shutdown signal received");
            if shutdown_tx.send(true).is_err() {
                debug!("gate already stopped");
            }
            (&mut gate).await
        }
    };

    if shutdown_tx.send(true).is_err() {
        debug!("no background task left to notify of shutdown");
    }
    for task in [Some(sweeper), Some(monitor), observability].into_iter().flatten() {
        if let Err(err) = task.await {
            warn!(%err, "background task ended abnormally");
        }
    }

    result
}
