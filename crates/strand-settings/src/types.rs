//! Settings schema.

use serde::{Deserialize, Serialize};
use strand_core::BackoffConfig;

/// Default search service endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws/search";
/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 120;

/// All Strand settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrandSettings {
    /// WebSocket endpoint of the remote search service.
    pub ws_url: String,
    /// Debounce window between a keystroke and the query send.
    pub debounce_ms: u64,
    /// Reconnect backoff parameters.
    pub backoff: BackoffConfig,
}

impl Default for StrandSettings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            backoff: BackoffConfig::default(),
        }
    }
}
