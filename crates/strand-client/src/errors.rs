//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Transport-layer errors inside the session driver.
///
/// These never cross the driver boundary: every variant funnels into the
/// standard reconnect path and is only logged. The presentation layer sees
/// nothing but the connection state staying non-open.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport-level connect failed.
    #[error("connect to {url} failed: {source}")]
    Connect {
        /// Endpoint that was being dialed.
        url: String,
        /// Underlying handshake or socket error.
        source: tungstenite::Error,
    },
}
