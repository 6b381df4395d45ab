//! Debounced query dispatch.
//!
//! Converts a rapid stream of input-change events into at most one network
//! send per settled pause in typing.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::SessionHandle;

/// Default quiet period between the last keystroke and the send.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);

/// Debounce layer in front of [`SessionHandle::send`].
///
/// The armed timer handle is exclusively owned here: arming a new timer
/// aborts the previous handle before replacing the reference, so two live
/// timers for the same purpose never coexist.
pub struct QueryDispatcher {
    session: SessionHandle,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl QueryDispatcher {
    /// Create a dispatcher that sends through `session` after `delay` of
    /// quiet.
    #[must_use]
    pub fn new(session: SessionHandle, delay: Duration) -> Self {
        Self {
            session,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `text` for sending after the configured quiet period.
    pub fn submit(&self, text: &str) {
        self.submit_after(text, self.delay);
    }

    /// [`submit`](Self::submit) with an explicit delay.
    ///
    /// Always cancels any previously scheduled, not-yet-fired send first.
    /// Empty-after-trim input schedules nothing — clearing the visible
    /// results is the controller's job, not an empty query's. For a burst
    /// of submits within the delay of each other, exactly the last
    /// non-empty text is ever sent, at most once, verbatim.
    pub fn submit_after(&self, text: &str, delay: Duration) {
        let mut pending = self.pending.lock();
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        if text.trim().is_empty() {
            return;
        }

        let session = self.session.clone();
        let text = text.to_string();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(len = text.len(), "debounce settled, dispatching query");
            session.send(&text);
        }));
    }

    /// Cancel any scheduled send without arming a replacement.
    ///
    /// Used when a new search session begins, so no stale query escapes
    /// after the user has moved on.
    pub fn cancel_pending(&self) {
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
        }
    }
}
