use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http::HeaderMap;
use hyper::Response;
use tracing::debug;

use crate::config::KeyConfig;
use crate::error::{AdmissionError, Result};
use crate::gate::response::{admitted, invalid_key, too_many_requests, RespBody};
use crate::security::{extract_client_key, AdmissionController, AdmissionResult};
use crate::telemetry::Metrics;

/// Everything a gate connection needs to decide on a request.
pub struct GateState {
    pub controller: Arc<AdmissionController>,
    pub key: KeyConfig,
    pub metrics: Option<Arc<Metrics>>,
}

impl GateState {
    pub fn new(
        controller: Arc<AdmissionController>,
        key: KeyConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self { controller, key, metrics }
    }
}

/// Run the admission check for an incoming request.
///
/// Returns:
/// - 204 with quota headers if the request is admitted
/// - 429 with `Retry-After` if the key is over its limit or cooling down
/// - 400 if no client key could be derived
pub fn check_admission(
    state: &GateState,
    peer: SocketAddr,
    headers: &HeaderMap,
) -> Result<Response<RespBody>> {
    let strategy = state.key.strategy.as_str();
    if let Some(m) = &state.metrics {
        m.record_check(strategy);
    }

    let now = Instant::now();
    let key = extract_client_key(&state.key, peer, headers).unwrap_or_default();
    let result = match state.controller.check_at(&key, now) {
        Ok(result) => result,
        Err(AdmissionError::InvalidKey) => {
            debug!(%peer, strategy, "request carried no client key");
            if let Some(m) = &state.metrics {
                m.record_invalid_key(strategy);
            }
            return invalid_key();
        }
        Err(e) => return Err(e),
    };

    match result {
        AdmissionResult::Allowed { limit, remaining, reset_at } => {
            debug!(limit, remaining, "admission check passed");
            if let Some(m) = &state.metrics {
                m.record_allowed(strategy);
            }
            admitted(limit, remaining, reset_at.saturating_duration_since(now))
        }
        AdmissionResult::Blocked { retry_after, reason } => {
            if let Some(m) = &state.metrics {
                m.record_blocked(strategy, reason);
            }
            too_many_requests(retry_after, reason)
        }
    }
}
