#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod gate;
pub mod security;
pub mod service;
pub mod telemetry;

pub use config::{load_from_path, Config};
pub use error::{AdmissionError, Result};
pub use gate::GateState;
pub use security::{AdmissionController, AdmissionResult, BlockReason, MetricsSnapshot};
pub use service::run_service;
