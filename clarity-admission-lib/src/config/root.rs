use serde::Deserialize;
use std::net::SocketAddr;

use super::admission::{AdmissionConfig, MonitorConfig};
use super::key::KeyConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port the admission gate listens on
    /// Example: "0.0.0.0:7000" or "127.0.0.1:8080"
    /// Default: "0.0.0.0:7000"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Sliding window, cooldown and sweep settings
    #[serde(default)]
    pub admission: AdmissionConfig,
    /// How the client key is derived from a request
    #[serde(default)]
    pub key: KeyConfig,
    /// Periodic metrics summary
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            admission: AdmissionConfig::default(),
            key: KeyConfig::default(),
            monitor: MonitorConfig::default(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 7000))
}
