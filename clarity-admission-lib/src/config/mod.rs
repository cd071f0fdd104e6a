mod admission;
mod key;
mod loader;
mod root;
mod telemetry;
mod validator;

pub use admission::{AdmissionConfig, MonitorConfig};
pub use key::{KeyConfig, KeyStrategy};
pub use loader::{apply_env_overrides, load_from_path, parse, MAX_REQUESTS_ENV};
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use validator::{validate, validate_admission, MAX_DURATION_SECS};
