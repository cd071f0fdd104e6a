pub mod admission;
pub mod client_key;

pub use admission::{AdmissionController, AdmissionResult, BlockReason, ClientKey, MetricsSnapshot};
pub use client_key::extract_client_key;
