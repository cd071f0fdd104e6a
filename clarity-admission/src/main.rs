#![forbid(unsafe_code)]

use clap::Parser;
use clarity_admission_lib::config::load_from_path;
use clarity_admission_lib::telemetry::{init_metrics, init_tracing};
use clarity_admission_lib::{run_service, AdmissionController};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Clarity admission gate (sliding window + cooldown)")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "CLARITY_ADMISSION_CONFIG",
        default_value = "config/admission.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config.display());
            std::process::exit(1);
        }
    };

    if let Err(err) =
        init_tracing(&cfg.logging.level, cfg.logging.show_target, &cfg.telemetry.otel_log_level)
    {
        eprintln!("failed to initialise tracing: {err}");
        std::process::exit(1);
    }

    info!(
        ?cfg.listen,
        window_seconds = cfg.admission.window_seconds,
        max_requests = cfg.admission.max_requests,
        block_duration_seconds = cfg.admission.block_duration_seconds,
        strategy = cfg.key.strategy.as_str(),
        "configuration loaded"
    );

    let controller = match AdmissionController::new(cfg.admission.clone()) {
        Ok(controller) => Arc::new(controller),
        Err(err) => {
            error!(%err, "invalid admission configuration");
            std::process::exit(1);
        }
    };

    let (metrics, registry) = match init_metrics() {
        Ok((metrics, registry)) => (Some(metrics), Some(registry)),
        Err(err) => {
            warn!(%err, "metrics disabled: failed to initialise exporter");
            (None, None)
        }
    };

    if let Err(err) = run_service(&cfg, controller, metrics, registry, wait_for_signal()).await {
        error!(%err, "admission gate exited with error");
        std::process::exit(1);
    }

    info!("shutdown complete");
}

async fn wait_for_signal() {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            warn!(%err, "failed to setup SIGTERM handler, waiting for Ctrl-C only");
            if let Err(err) = signal::ctrl_c().await {
                error!(%err, "failed to listen for Ctrl-C");
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        res = signal::ctrl_c() => {
            if let Err(err) = res {
                error!(%err, "failed to listen for Ctrl-C");
            }
            info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}
