//! Channel session — one logical connection to the search service, held
//! open for the life of the application and automatically recovering from
//! drops.
//!
//! The public [`ChannelSession`] is a handle; the connection itself lives in
//! a spawned driver task that exclusively owns the WebSocket stream and the
//! reconnect timer. Every transport callback (dial result, inbound frame,
//! close, error) funnels through the single transition function in
//! `strand-core`, so an error always takes the same close-then-backoff path
//! as a plain disconnect.

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use strand_core::{
    BackoffConfig, ConnectionState, SearchResult, SessionEvent, parse_result_set, reconnect_delay,
};

use crate::errors::SessionError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Capacity of the handle-to-driver command channel.
const COMMAND_BUFFER: usize = 64;
/// Capacity of the inbound result-set channel.
const INBOUND_BUFFER: usize = 64;

/// Commands from a [`SessionHandle`] to the driver task.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Begin connecting if not already connecting or open.
    Open,
    /// Transmit one query string.
    Send(String),
}

/// Cloneable sender half of a session.
///
/// Held by the dispatcher so a fired debounce timer can reach the driver
/// without owning the whole session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<SessionCommand>,
        state_rx: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { cmd_tx, state_rx }
    }

    /// Transmit `text` verbatim as one text frame.
    ///
    /// A silent no-op unless the channel is currently open: a query issued
    /// while disconnected is dropped, never queued and never retried. The
    /// debounce layer's most-recent-wins semantics resend after a reconnect
    /// only if the user types again.
    pub fn send(&self, text: &str) {
        if !self.state_rx.borrow().is_open() {
            debug!("channel not open, query dropped");
            return;
        }
        if self
            .cmd_tx
            .try_send(SessionCommand::Send(text.to_string()))
            .is_err()
        {
            debug!("session driver unavailable, query dropped");
        }
    }

    fn open(&self) {
        if self.cmd_tx.try_send(SessionCommand::Open).is_err() {
            debug!("session driver unavailable, open request dropped");
        }
    }
}

/// One logical connection to a configured endpoint.
///
/// Created once per endpoint URL. Dropping or [tearing down](Self::teardown)
/// the session cancels the driver and its reconnect loop for good; a
/// torn-down session is never reused.
pub struct ChannelSession {
    handle: SessionHandle,
    cancel: CancellationToken,
    _driver: JoinHandle<()>,
}

impl ChannelSession {
    /// Create a session for `url` and the receiver of its inbound result
    /// sets.
    ///
    /// The driver task is spawned immediately but stays idle until
    /// [`open`](Self::open) is called. Must be called within a tokio
    /// runtime.
    pub fn new(
        url: String,
        backoff: BackoffConfig,
    ) -> (Self, mpsc::Receiver<Vec<SearchResult>>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);
        let cancel = CancellationToken::new();

        let driver = tokio::spawn(drive(
            url,
            backoff,
            cmd_rx,
            state_tx,
            inbound_tx,
            cancel.clone(),
        ));

        let session = Self {
            handle: SessionHandle::new(cmd_tx, state_rx),
            cancel,
            _driver: driver,
        };
        (session, inbound_rx)
    }

    /// Ask the driver to connect. Idempotent: a no-op while already
    /// connecting or open.
    pub fn open(&self) {
        self.handle.open();
    }

    /// Send a query string; see [`SessionHandle::send`].
    pub fn send(&self, text: &str) {
        self.handle.send(text);
    }

    /// A cloneable handle for the dispatcher.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Read-only observer of the connection state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.handle.state_rx.clone()
    }

    /// Tear the session down for good: cancels any pending reconnect timer
    /// and closes the transport without triggering further reconnection.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        // A dropped session must not leave a reconnect loop running.
        self.cancel.cancel();
    }
}

/// Current state plus the watch that publishes it.
struct Lifecycle {
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
}

impl Lifecycle {
    fn apply(&mut self, event: SessionEvent) {
        let next = self.state.on_event(event);
        if next != self.state {
            debug!(from = %self.state, to = %next, ?event, "connection state transition");
            self.state = next;
            let _ = self.state_tx.send_replace(next);
        }
    }
}

/// Teardown: `Closing` while the transport goes away, then `Closed`.
fn finish(lifecycle: &mut Lifecycle) {
    lifecycle.apply(SessionEvent::TeardownRequested);
    lifecycle.apply(SessionEvent::Disconnected);
}

/// Session driver: waits for the first open request, then dials and serves
/// the connection in a loop, backing off between attempts, until cancelled.
#[instrument(skip_all, fields(url = %url))]
async fn drive(
    url: String,
    backoff: BackoffConfig,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<ConnectionState>,
    inbound_tx: mpsc::Sender<Vec<SearchResult>>,
    cancel: CancellationToken,
) {
    let mut lifecycle = Lifecycle {
        state: ConnectionState::Closed,
        state_tx,
    };

    // Idle until the first open request.
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                finish(&mut lifecycle);
                return;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Open) => break,
                Some(SessionCommand::Send(_)) => debug!("channel not open, query dropped"),
                None => return,
            }
        }
    }

    let mut attempt: u32 = 0;
    loop {
        lifecycle.apply(SessionEvent::OpenRequested);
        let dialed = tokio::select! {
            () = cancel.cancelled() => {
                finish(&mut lifecycle);
                return;
            }
            result = dial(&url) => result,
        };

        match dialed {
            Ok(ws) => {
                lifecycle.apply(SessionEvent::ConnectSucceeded);
                attempt = 0;
                info!("channel open");
                match serve(ws, &mut cmd_rx, &mut lifecycle, &inbound_tx, &cancel).await {
                    ServeOutcome::Disconnected => {}
                    ServeOutcome::Teardown => return,
                }
            }
            Err(error) => {
                warn!(%error, "connect failed");
                lifecycle.apply(SessionEvent::TransportError);
            }
        }

        // State is Closed here; arm exactly one reconnect timer.
        let delay = reconnect_delay(&backoff, attempt);
        attempt += 1;
        debug!(?delay, attempt, "reconnect scheduled");
        if !wait_backoff(delay, &mut cmd_rx, &cancel).await {
            finish(&mut lifecycle);
            return;
        }
    }
}

async fn dial(url: &str) -> Result<WsStream, SessionError> {
    let (ws, _response) = connect_async(url)
        .await
        .map_err(|source| SessionError::Connect {
            url: url.to_string(),
            source,
        })?;
    Ok(ws)
}

/// Why `serve` returned.
enum ServeOutcome {
    /// The transport went away; the caller schedules a reconnect.
    Disconnected,
    /// Teardown was requested; the driver must exit.
    Teardown,
}

/// Serve one established connection until it drops or the session is torn
/// down.
async fn serve(
    ws: WsStream,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    lifecycle: &mut Lifecycle,
    inbound_tx: &mpsc::Sender<Vec<SearchResult>>,
    cancel: &CancellationToken,
) -> ServeOutcome {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                return close_for_teardown(&mut ws_tx, lifecycle).await;
            }
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Send(text)) => {
                    debug!(len = text.len(), "sending query");
                    if let Err(error) = ws_tx.send(Message::Text(text.into())).await {
                        warn!(%error, "send failed, forcing close");
                        let _ = ws_tx.close().await;
                        lifecycle.apply(SessionEvent::TransportError);
                        return ServeOutcome::Disconnected;
                    }
                }
                Some(SessionCommand::Open) => {} // already open
                None => {
                    // Every handle is gone; nothing can use this session
                    // again, so treat it as a teardown.
                    return close_for_teardown(&mut ws_tx, lifecycle).await;
                }
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(payload))) => deliver(&payload, inbound_tx),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("server closed the connection");
                    lifecycle.apply(SessionEvent::Disconnected);
                    return ServeOutcome::Disconnected;
                }
                // Binary, ping, and pong frames carry no result sets.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    // Force closure rather than leaving the socket
                    // half-open, then fall into the reconnect path.
                    warn!(%error, "transport error, forcing close");
                    let _ = ws_tx.close().await;
                    lifecycle.apply(SessionEvent::TransportError);
                    return ServeOutcome::Disconnected;
                }
            },
        }
    }
}

async fn close_for_teardown(ws_tx: &mut WsSink, lifecycle: &mut Lifecycle) -> ServeOutcome {
    lifecycle.apply(SessionEvent::TeardownRequested);
    let _ = ws_tx.close().await;
    lifecycle.apply(SessionEvent::Disconnected);
    ServeOutcome::Teardown
}

/// Parse one inbound payload and pass the result set on.
///
/// Malformed payloads (invalid JSON, JSON non-array, undecodable elements)
/// are dropped without any state change: one lost server push is harmless,
/// the next push supersedes it.
fn deliver(payload: &str, inbound_tx: &mpsc::Sender<Vec<SearchResult>>) {
    match parse_result_set(payload) {
        Some(set) => {
            debug!(count = set.len(), "result set received");
            if inbound_tx.try_send(set).is_err() {
                debug!("inbound receiver full or gone, result set dropped");
            }
        }
        None => debug!("discarding malformed inbound payload"),
    }
}

/// Sleep out the backoff delay.
///
/// Commands arriving meanwhile are drained and dropped (the channel is not
/// open), teardown is still honored. Returns `false` when the driver must
/// exit instead of redialing.
async fn wait_backoff(
    delay: std::time::Duration,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    cancel: &CancellationToken,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = cancel.cancelled() => return false,
            () = &mut sleep => return true,
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Send(_)) => debug!("channel not open, query dropped"),
                Some(SessionCommand::Open) => {} // reconnect already scheduled
                None => return false,
            }
        }
    }
}
