use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gate::handler::{check_admission, GateState};
use crate::gate::response::fallback_response;

/// How long in-flight connections get to finish once shutdown is requested
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Guard to decrement active connections counter when dropped
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Bind `listen` and serve the gate until `shutdown` flips to `true`.
pub async fn run(
    listen: SocketAddr,
    state: Arc<GateState>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    serve(listener, state, shutdown).await
}

/// Serve the gate on an already bound listener.
///
/// Every request, whatever its method or path, is answered with the admission
/// decision for the key it carries.
pub async fn serve(
    listener: TcpListener,
    state: Arc<GateState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let builder = ConnBuilder::new(TokioExecutor::new());
    let active_connections = Arc::new(AtomicUsize::new(0));

    info!(?addr, "admission gate started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("admission gate: shutdown requested");
                    break;
                }
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                active_connections.fetch_add(1, Ordering::Relaxed);
                let guard = ConnectionGuard(active_connections.clone());
                let state = state.clone();
                let builder = builder.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move {
                            match check_admission(&state, peer, req.headers()) {
                                Ok(resp) => Ok::<_, hyper::Error>(resp),
                                Err(e) => {
                                    warn!(?peer, error = %e, "failed to build admission response");
                                    Ok(fallback_response(StatusCode::INTERNAL_SERVER_ERROR))
                                }
                            }
                        }
                    });

                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        debug!(?peer, error = %e, "serve_connection error");
                    }
                });
            }
        }
    }

    let start = Instant::now();
    loop {
        let active = active_connections.load(Ordering::Relaxed);
        if active == 0 {
            break;
        }
        if start.elapsed() >= SHUTDOWN_GRACE {
            warn!(active_connections = active, "shutdown grace elapsed with connections still open");
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    info!("admission gate stopped");
    Ok(())
}
