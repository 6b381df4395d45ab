//! Connection lifecycle state machine.
//!
//! All transport callbacks (open, close, error) and caller requests funnel
//! through one transition function, [`ConnectionState::on_event`], so a
//! transport error always takes the same close-then-backoff path as a plain
//! disconnect instead of growing its own handling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the search channel.
///
/// Exactly one state is active at any time. Transitions are driven only by
/// the session driver; every other component observes the state read-only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// A transport-level connect is in flight.
    Connecting,
    /// The channel is live; queries can be sent.
    Open,
    /// Teardown has begun; no further reconnect will ever be scheduled.
    Closing,
    /// No live transport. The initial state, and the state between a
    /// disconnect and the next reconnect attempt.
    #[default]
    Closed,
}

/// Events that drive [`ConnectionState`] transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The caller asked for the channel to be opened.
    OpenRequested,
    /// The transport-level connect completed.
    ConnectSucceeded,
    /// The transport closed, intentionally or not.
    Disconnected,
    /// The transport reported an error.
    TransportError,
    /// The caller asked for the session to be torn down for good.
    TeardownRequested,
}

impl ConnectionState {
    /// Apply one event and return the next state.
    ///
    /// `TeardownRequested` wins from any state and is terminal: once
    /// `Closing` is reached the only remaining transition is the final
    /// `Disconnected`/`TransportError` into `Closed` when the transport
    /// actually goes away. Every other event is ignored after teardown.
    ///
    /// `OpenRequested` is idempotent: it is a no-op while `Connecting` or
    /// `Open`.
    #[must_use]
    pub fn on_event(self, event: SessionEvent) -> Self {
        match (self, event) {
            // Teardown is terminal from everywhere.
            (Self::Closing | Self::Closed, SessionEvent::TeardownRequested) => self,
            (_, SessionEvent::TeardownRequested) => Self::Closing,
            (Self::Closing, SessionEvent::Disconnected | SessionEvent::TransportError) => {
                Self::Closed
            }
            (Self::Closing, _) => Self::Closing,

            (Self::Closed, SessionEvent::OpenRequested) => Self::Connecting,
            (Self::Connecting, SessionEvent::ConnectSucceeded) => Self::Open,
            // Errors and disconnects share one path, whether the dial
            // failed or an established connection dropped.
            (
                Self::Connecting | Self::Open,
                SessionEvent::Disconnected | SessionEvent::TransportError,
            ) => Self::Closed,

            // Everything else (redundant opens, stray connect events) is
            // a no-op.
            (state, _) => state,
        }
    }

    /// Whether queries can currently be sent.
    #[must_use]
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::{Closed, Closing, Connecting, Open};
    use SessionEvent::{
        ConnectSucceeded, Disconnected, OpenRequested, TeardownRequested, TransportError,
    };

    #[test]
    fn happy_path() {
        let s = Closed.on_event(OpenRequested);
        assert_eq!(s, Connecting);
        let s = s.on_event(ConnectSucceeded);
        assert_eq!(s, Open);
        let s = s.on_event(Disconnected);
        assert_eq!(s, Closed);
    }

    #[test]
    fn open_is_idempotent() {
        assert_eq!(Connecting.on_event(OpenRequested), Connecting);
        assert_eq!(Open.on_event(OpenRequested), Open);
    }

    #[test]
    fn error_takes_same_path_as_disconnect() {
        assert_eq!(
            Open.on_event(TransportError),
            Open.on_event(Disconnected)
        );
        assert_eq!(
            Connecting.on_event(TransportError),
            Connecting.on_event(Disconnected)
        );
    }

    #[test]
    fn dial_failure_closes() {
        assert_eq!(Connecting.on_event(Disconnected), Closed);
    }

    #[test]
    fn teardown_from_every_live_state() {
        assert_eq!(Closed.on_event(TeardownRequested), Closing);
        assert_eq!(Connecting.on_event(TeardownRequested), Closing);
        assert_eq!(Open.on_event(TeardownRequested), Closing);
    }

    #[test]
    fn closing_only_accepts_the_final_close() {
        assert_eq!(Closing.on_event(OpenRequested), Closing);
        assert_eq!(Closing.on_event(ConnectSucceeded), Closing);
        assert_eq!(Closing.on_event(TeardownRequested), Closing);
        assert_eq!(Closing.on_event(Disconnected), Closed);
        assert_eq!(Closing.on_event(TransportError), Closed);
    }

    #[test]
    fn stray_connect_event_ignored() {
        assert_eq!(Closed.on_event(ConnectSucceeded), Closed);
        assert_eq!(Open.on_event(ConnectSucceeded), Open);
    }

    #[test]
    fn default_is_closed() {
        assert_eq!(ConnectionState::default(), Closed);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Open.to_string(), "open");
        assert_eq!(Connecting.to_string(), "connecting");
        assert_eq!(Closing.to_string(), "closing");
        assert_eq!(Closed.to_string(), "closed");
    }
}
