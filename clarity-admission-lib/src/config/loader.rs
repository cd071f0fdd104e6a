use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::validator::validate;
use crate::config::Config;
use crate::error::{AdmissionError, Result};

/// Environment variable that overrides `admission.max_requests`
pub const MAX_REQUESTS_ENV: &str = "RATE_LIMIT_MAX_REQUESTS";

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| AdmissionError::Config(format!("Failed to read config file: {e}")))?;
    let mut cfg = parse(&txt)?;

    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok())?;
    validate(&cfg)?;

    Ok(cfg)
}

pub fn parse(txt: &str) -> Result<Config> {
    toml::from_str(txt).map_err(|e| AdmissionError::Config(format!("Failed to parse config: {e}")))
}

/// Apply environment overrides using `lookup` to read variables
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(MAX_REQUESTS_ENV) {
        let max_requests = raw.trim().parse::<u32>().map_err(|e| {
            AdmissionError::Config(format!("{MAX_REQUESTS_ENV} must be a positive integer: {e}"))
        })?;
        info!(max_requests, "max_requests overridden from environment");
        cfg.admission.max_requests = max_requests;
    }
    Ok(())
}
