use std::time::{Duration, Instant};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// This request found the sliding window full and started a cooldown.
    Threshold,
    /// The key was already cooling down.
    Cooldown,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Threshold => "window",
            BlockReason::Cooldown => "cooldown",
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionResult {
    /// Request may proceed.
    Allowed {
        /// Requests admitted per window
        limit: u32,
        /// Requests left in the current window after this one
        remaining: u32,
        /// When the window that admitted this request ends
        reset_at: Instant,
    },
    /// Request must be rejected.
    Blocked {
        /// Time until the key's cooldown ends
        retry_after: Duration,
        reason: BlockReason,
    },
}

impl AdmissionResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionResult::Allowed { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, AdmissionResult::Blocked { .. })
    }

    /// Remaining quota; zero when blocked.
    pub fn remaining(&self) -> u32 {
        match self {
            AdmissionResult::Allowed { remaining, .. } => *remaining,
            AdmissionResult::Blocked { .. } => 0,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AdmissionResult::Blocked { retry_after, .. } => Some(*retry_after),
            AdmissionResult::Allowed { .. } => None,
        }
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            AdmissionResult::Blocked { reason, .. } => Some(*reason),
            AdmissionResult::Allowed { .. } => None,
        }
    }
}
