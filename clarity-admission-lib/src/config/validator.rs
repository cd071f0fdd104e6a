use http::HeaderName;

use crate::config::{AdmissionConfig, Config, KeyStrategy};
use crate::error::{AdmissionError, Result};

/// Longest window or cooldown accepted, in seconds (one year)
pub const MAX_DURATION_SECS: u64 = 31_536_000;

pub fn validate(config: &Config) -> Result<()> {
    validate_admission(&config.admission)?;
    if config.monitor.interval_seconds == 0 {
        return Err(invalid("monitor.interval_seconds must be > 0"));
    }
    let ratio = config.monitor.high_block_ratio;
    if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
        return Err(invalid("monitor.high_block_ratio must be in (0, 1]"));
    }
    if config.key.strategy == KeyStrategy::Header {
        let Some(name) = config.key.header_name.as_deref() else {
            return Err(invalid("key.header_name is required when strategy = \"header\""));
        };
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            return Err(AdmissionError::Config(format!(
                "key.header_name is not a valid header: {name}"
            )));
        }
    }
    Ok(())
}

pub fn validate_admission(admission: &AdmissionConfig) -> Result<()> {
    if admission.window_seconds == 0 {
        return Err(invalid("admission.window_seconds must be > 0"));
    }
    if admission.max_requests == 0 {
        return Err(invalid("admission.max_requests must be > 0"));
    }
    if admission.block_duration_seconds == 0 {
        return Err(invalid("admission.block_duration_seconds must be > 0"));
    }
    if admission.metrics_reset_interval_seconds == 0 {
        return Err(invalid("admission.metrics_reset_interval_seconds must be > 0"));
    }
    if admission.sweep_interval_seconds == 0 {
        return Err(invalid("admission.sweep_interval_seconds must be > 0"));
    }
    if admission.shards == 0 {
        return Err(invalid("admission.shards must be > 0"));
    }
    let durations = [
        ("window_seconds", admission.window_seconds),
        ("block_duration_seconds", admission.block_duration_seconds),
        ("metrics_reset_interval_seconds", admission.metrics_reset_interval_seconds),
        ("sweep_interval_seconds", admission.sweep_interval_seconds),
    ];
    for (name, secs) in durations {
        if secs > MAX_DURATION_SECS {
            return Err(AdmissionError::Config(format!(
                "admission.{name} must be <= {MAX_DURATION_SECS}"
            )));
        }
    }
    Ok(())
}

fn invalid(msg: &str) -> AdmissionError {
    AdmissionError::Config(msg.to_string())
}
