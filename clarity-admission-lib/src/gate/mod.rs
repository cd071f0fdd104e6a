//! Forward-auth HTTP gate
//!
//! A reverse proxy sends a subrequest per client request; the gate answers
//! 204 to let it through, 429 to refuse it and 400 when no key is present.

pub mod handler;
pub mod response;
pub mod server;

pub use handler::{check_admission, GateState};
pub use response::{
    apply_quota_headers, invalid_key, json_response, retry_after_secs, too_many_requests,
    RespBody, HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET,
};
pub use server::{run, serve, SHUTDOWN_GRACE};
