//! Race-free glue between raw input and the visible result set.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use strand_core::{BackoffConfig, ConnectionState, SearchResult};

use crate::dispatch::{DEFAULT_DEBOUNCE, QueryDispatcher};
use crate::session::ChannelSession;

/// Everything needed to stand up a controller against one endpoint.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint of the remote search service.
    pub url: String,
    /// Debounce window between a keystroke and the query send.
    pub debounce: Duration,
    /// Reconnect backoff parameters.
    pub backoff: BackoffConfig,
}

impl ClientConfig {
    /// Config for `url` with the default debounce and backoff.
    #[must_use]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            debounce: DEFAULT_DEBOUNCE,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Composes the session and the dispatcher, and owns the result-set
/// clearing semantics on new input.
///
/// The surface the presentation layer consumes is exactly: the two watch
/// receivers ([`connection_state`](Self::connection_state),
/// [`results`](Self::results)) and [`on_input_changed`](Self::on_input_changed).
pub struct ReactiveSearchController {
    session: ChannelSession,
    dispatcher: QueryDispatcher,
    config: ClientConfig,
    results_tx: watch::Sender<Vec<SearchResult>>,
    forwarder: JoinHandle<()>,
}

impl ReactiveSearchController {
    /// Build a controller; the channel stays idle until [`open`](Self::open).
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (results_tx, _) = watch::channel(Vec::new());
        let (session, dispatcher, forwarder) = wire(&config, results_tx.clone());
        Self {
            session,
            dispatcher,
            config,
            results_tx,
            forwarder,
        }
    }

    /// Open the underlying channel (idempotent).
    pub fn open(&self) {
        self.session.open();
    }

    /// Entry point for the presentation layer on every input change.
    ///
    /// Synchronously clears the visible result set before anything else —
    /// unconditionally, even for non-empty input, so results from the
    /// previous query never remain visible while a new one is in flight.
    /// Then cancels any pending debounced send, and schedules a new one
    /// when the trimmed input is non-empty.
    pub fn on_input_changed(&self, text: &str) {
        let _ = self.results_tx.send_replace(Vec::new());
        self.dispatcher.cancel_pending();
        if !text.trim().is_empty() {
            self.dispatcher.submit(text);
        }
    }

    /// Read-only observer of the connection state.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.session.state()
    }

    /// Read-only observer of the current result set.
    #[must_use]
    pub fn results(&self) -> watch::Receiver<Vec<SearchResult>> {
        self.results_tx.subscribe()
    }

    /// Switch to a different endpoint.
    ///
    /// Tears the old session down first — cancelling its reconnect loop —
    /// before dialing the new one, so two reconnect loops never compete.
    /// The visible result set is cleared and the new channel is opened
    /// immediately.
    pub fn reconfigure_endpoint(&mut self, url: impl Into<String>) {
        let url = url.into();
        info!(%url, "switching endpoint");
        self.dispatcher.cancel_pending();
        self.session.teardown();
        self.forwarder.abort();

        self.config.url = url;
        let _ = self.results_tx.send_replace(Vec::new());
        let (session, dispatcher, forwarder) = wire(&self.config, self.results_tx.clone());
        self.session = session;
        self.dispatcher = dispatcher;
        self.forwarder = forwarder;
        self.session.open();
    }

    /// Tear the controller down for good: no further sends, no further
    /// reconnects.
    pub fn teardown(&self) {
        self.dispatcher.cancel_pending();
        self.session.teardown();
    }
}

impl Drop for ReactiveSearchController {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Stand up a session, its dispatcher, and the task that forwards inbound
/// result sets into the results watch — wholesale replacement on every
/// delivery, last delivery wins.
fn wire(
    config: &ClientConfig,
    results_tx: watch::Sender<Vec<SearchResult>>,
) -> (ChannelSession, QueryDispatcher, JoinHandle<()>) {
    let (session, mut inbound_rx) = ChannelSession::new(config.url.clone(), config.backoff.clone());
    let dispatcher = QueryDispatcher::new(session.handle(), config.debounce);
    let forwarder = tokio::spawn(async move {
        while let Some(set) = inbound_rx.recv().await {
            let _ = results_tx.send_replace(set);
        }
    });
    (session, dispatcher, forwarder)
}
