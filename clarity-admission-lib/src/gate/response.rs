use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::Response;
use serde::Serialize;
use serde_json::json;

use crate::error::{AdmissionError, Result};
use crate::security::admission::BlockReason;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";

/// Whole seconds a client should wait, rounded up so it never retries early.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

/// Attach quota headers for an admitted request
///
/// `X-RateLimit-Reset` carries the seconds until the admitting window ends.
pub fn apply_quota_headers(
    headers: &mut HeaderMap,
    limit: u32,
    remaining: u32,
    reset_after: Duration,
) {
    headers.insert(HeaderName::from_static(HEADER_LIMIT), HeaderValue::from(limit));
    headers.insert(HeaderName::from_static(HEADER_REMAINING), HeaderValue::from(remaining));
    headers.insert(
        HeaderName::from_static(HEADER_RESET),
        HeaderValue::from(retry_after_secs(reset_after)),
    );
}

/// 204 carrying the quota headers
pub fn admitted(limit: u32, remaining: u32, reset_after: Duration) -> Result<Response<RespBody>> {
    let mut resp = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(empty_body())
        .map_err(|e| AdmissionError::Http(format!("Failed to build admitted response: {e}")))?;
    apply_quota_headers(resp.headers_mut(), limit, remaining, reset_after);
    Ok(resp)
}

/// 429 with `Retry-After` and a JSON body carrying `retry_after` seconds
pub fn too_many_requests(
    retry_after: Duration,
    reason: BlockReason,
) -> Result<Response<RespBody>> {
    let secs = retry_after_secs(retry_after);
    let detail = match reason {
        BlockReason::Threshold => "Rate limit exceeded. Please try again later.",
        BlockReason::Cooldown => "Too many requests. Please try again later.",
    };
    let mut resp = json_response(
        StatusCode::TOO_MANY_REQUESTS,
        &json!({"detail": detail, "retry_after": secs}),
    )?;
    resp.headers_mut().insert(RETRY_AFTER, HeaderValue::from(secs));
    resp.headers_mut()
        .insert(HeaderName::from_static(HEADER_REMAINING), HeaderValue::from_static("0"));
    Ok(resp)
}

/// 400 for a request that carried no usable client key
pub fn invalid_key() -> Result<Response<RespBody>> {
    json_response(StatusCode::BAD_REQUEST, &json!({"detail": "Missing client key"}))
}

pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| AdmissionError::Http(format!("Failed to serialize response: {e}")))?;

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(body_bytes))
        .map_err(|e| AdmissionError::Http(format!("Failed to build response: {e}")))
}

/// Plain response used when building a real one failed
pub fn fallback_response(status: StatusCode) -> Response<RespBody> {
    let reason = status.canonical_reason().unwrap_or("");
    let mut resp = Response::new(full_body(reason));
    *resp.status_mut() = status;
    resp
}

pub fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

fn empty_body() -> RespBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}
