//! Request admission control.
//!
//! One parameterised policy replaces the ad hoc limiters a text API tends to
//! accumulate:
//!
//! - **Sliding window**: each key's admitted requests are counted over the
//!   trailing `window_seconds`; the request that finds `max_requests` already
//!   there is refused.
//! - **Cooldown**: that refusal blocks the key for `block_duration_seconds`.
//!   Requests during the cooldown are refused without touching the window and
//!   do not extend it. The window restarts empty once the cooldown ends.
//! - **Aggregate metrics**: totals, blocked count, distinct keys and an
//!   hourly histogram, zeroed every `metrics_reset_interval_seconds`.
//!
//! A background sweeper ([`spawn_sweeper`]) evicts expired history and
//! blocks so keys that go quiet do not pin memory. All state is in-memory and
//! lost on restart.
//!
//! # Example Usage
//!
//! ```ignore
//! use clarity_admission_lib::config::AdmissionConfig;
//! use clarity_admission_lib::security::admission::{AdmissionController, AdmissionResult};
//!
//! let controller = AdmissionController::new(AdmissionConfig::default())?;
//!
//! match controller.check("192.168.1.1")? {
//!     AdmissionResult::Allowed { limit, remaining, .. } => {
//!         println!("Request allowed. {}/{} remaining", remaining, limit);
//!     }
//!     AdmissionResult::Blocked { retry_after, .. } => {
//!         println!("Blocked. Try again in {:?}", retry_after);
//!         // Return 429 Too Many Requests
//!     }
//! }
//! ```

mod controller;
mod key;
mod metrics;
mod result;
mod sweeper;
mod window;

pub use controller::{AdmissionController, SweepStats};
pub use key::ClientKey;
pub use metrics::{HourClock, MetricsSnapshot, HOUR_LABEL_FORMAT};
pub use result::{AdmissionResult, BlockReason};
pub use sweeper::spawn_sweeper;
pub use window::RequestLog;

use ahash::RandomState;
use std::hash::Hash;

#[inline]
fn hash<T: Hash>(key: T, hasher: &RandomState) -> u64 {
    hasher.hash_one(key)
}
