use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::{AdmissionError, Result};

/// Identifier that buckets admission state: an IP address, a verified token
/// subject or an API key.
///
/// Cloning is cheap; the same allocation backs the per-key state and the
/// distinct-key set of the aggregate metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(Arc<str>);

impl ClientKey {
    /// Build a key, rejecting empty or whitespace-only input.
    pub fn new(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(AdmissionError::InvalidKey);
        }
        Ok(Self(Arc::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClientKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
