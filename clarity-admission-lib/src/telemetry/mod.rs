pub mod health;
pub mod metrics;
pub mod metrics_handler;
pub mod monitor;
pub mod server;
pub mod tracing;

pub use health::{health_check_response, live_check_response, stats_response, StatsResponse};
pub use metrics::{init_metrics, Metrics};
pub use metrics_handler::handle_metrics;
pub use monitor::{spawn_monitor, MonitorReport};
pub use server::{serve_observability, start_observability_server};
pub use self::tracing::init_tracing;
