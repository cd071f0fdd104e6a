use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
use crate::gate::response::{fallback_response, RespBody};
use crate::security::AdmissionController;
use crate::telemetry::{
    handle_metrics, health_check_response, live_check_response, stats_response,
};

/// Start the observability server that handles metrics and health checks
/// This server runs on a dedicated port and serves:
/// - `/metrics` - Prometheus metrics
/// - `/stats` - Admission counters as JSON
/// - `/health` - Health check endpoint
/// - `/live` - Liveness check endpoint
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    controller: Arc<AdmissionController>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve_observability(listener, registry, controller, shutdown).await
}

/// Serve the observability routes on an already bound listener.
pub async fn serve_observability(
    listener: TcpListener,
    registry: Registry,
    controller: Arc<AdmissionController>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let registry = Arc::new(registry);
    let addr = listener.local_addr()?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Observability server: shutdown requested");
                    break;
                }
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let controller = controller.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let controller = controller.clone();
                        async move {
                            Ok::<_, hyper::Error>(route(req.uri().path(), &registry, &controller))
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}

fn route(path: &str, registry: &Registry, controller: &AdmissionController) -> Response<RespBody> {
    let result = match path {
        "/health" => health_check_response(),
        "/live" => live_check_response(),
        "/metrics" => handle_metrics(registry),
        "/stats" => stats_response(controller),
        _ => return fallback_response(StatusCode::NOT_FOUND),
    };
    result.unwrap_or_else(|e| {
        warn!(path, error = %e, "Observability server: failed to build response");
        fallback_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}
