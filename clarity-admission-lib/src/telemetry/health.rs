use std::time::Instant;

use hyper::Response;
use hyper::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::gate::response::{json_response, RespBody};
use crate::security::{AdmissionController, MetricsSnapshot};

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}))
}

/// Liveness check - always returns 200 if process is running
pub fn live_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "alive"}))
}

/// Body of `/stats`: the aggregate snapshot plus live gauges.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub blocked_keys_count: usize,
    pub tracked_keys_count: usize,
    pub current_hour: String,
    pub current_hour_requests: u64,
}

impl StatsResponse {
    pub fn collect(controller: &AdmissionController, now: Instant) -> Self {
        let snapshot = controller.metrics_at(now);
        let current_hour = controller.hour_label(now);
        let current_hour_requests = snapshot.requests_in_hour(&current_hour);
        Self {
            snapshot,
            blocked_keys_count: controller.blocked_keys(now),
            tracked_keys_count: controller.tracked_keys(),
            current_hour,
            current_hour_requests,
        }
    }
}

pub fn stats_response(controller: &AdmissionController) -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &StatsResponse::collect(controller, Instant::now()))
}
