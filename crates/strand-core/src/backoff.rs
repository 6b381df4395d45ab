//! Reconnect backoff configuration and delay math.
//!
//! The async reconnect loop lives in `strand-client`; this module holds the
//! portable, sync-only pieces: [`BackoffConfig`] and [`reconnect_delay`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default delay cap in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 4_000;

/// Reconnect backoff parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffConfig {
    /// Base delay for the first reconnect attempt in ms (default: 500).
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in ms (default: 4000).
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// Delay before reconnect attempt number `attempt` (zero-based).
///
/// Formula: `min(max_delay, base_delay * 2^attempt)`. Capped, never
/// abandoned — the attempt counter may grow without bound, the delay
/// saturates at the cap.
#[must_use]
pub fn reconnect_delay(config: &BackoffConfig, attempt: u32) -> Duration {
    let exponential = config.base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(exponential.min(config.max_delay_ms))
}
