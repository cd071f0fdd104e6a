use serde::Deserialize;
use std::time::Duration;

/// Admission control configuration
///
/// One sliding-window policy with a hard cooldown once the threshold is reached.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AdmissionConfig {
    /// Length of the sliding window in seconds
    /// Default: 60
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// Requests admitted per key within one window
    /// Can be overridden with the `RATE_LIMIT_MAX_REQUESTS` environment variable
    /// Default: 50
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Cooldown applied to a key once it reaches `max_requests`
    /// Default: 300 (5 minutes)
    #[serde(default = "default_block_duration_seconds")]
    pub block_duration_seconds: u64,
    /// Aggregate metrics are zeroed once this much time has passed since the last reset
    /// Default: 86400 (24 hours)
    #[serde(default = "default_metrics_reset_interval_seconds")]
    pub metrics_reset_interval_seconds: u64,
    /// Period of the background sweep that evicts expired history and blocks
    /// Default: 60
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Number of independently locked key shards
    /// Default: 16
    #[serde(default = "default_shards")]
    pub shards: usize,
}

impl AdmissionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_secs(self.block_duration_seconds)
    }

    pub fn metrics_reset_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_reset_interval_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            max_requests: default_max_requests(),
            block_duration_seconds: default_block_duration_seconds(),
            metrics_reset_interval_seconds: default_metrics_reset_interval_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            shards: default_shards(),
        }
    }
}

/// Periodic metrics summary configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// How often the aggregate summary is logged
    /// Default: 3600 (hourly)
    #[serde(default = "default_monitor_interval_seconds")]
    pub interval_seconds: u64,
    /// Blocked/total ratio above which the summary is logged as a warning
    /// Default: 0.1
    #[serde(default = "default_high_block_ratio")]
    pub high_block_ratio: f64,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_monitor_interval_seconds(),
            high_block_ratio: default_high_block_ratio(),
        }
    }
}

fn default_window_seconds() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    50
}

fn default_block_duration_seconds() -> u64 {
    300
}

fn default_metrics_reset_interval_seconds() -> u64 {
    86400
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_shards() -> usize {
    16
}

fn default_monitor_interval_seconds() -> u64 {
    3600
}

fn default_high_block_ratio() -> f64 {
    0.1
}
