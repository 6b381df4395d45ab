//! End-to-end tests against an in-process WebSocket server.
//!
//! Each test stands up a real `tokio-tungstenite` server on a loopback
//! port and drives the full stack through the public controller surface.

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use strand_client::{ClientConfig, ReactiveSearchController};
use strand_core::BackoffConfig;

type ServerWs = WebSocketStream<TcpStream>;

/// Generous ceiling for anything that should happen promptly.
const WAIT: Duration = Duration::from_secs(5);
/// Window in which something must NOT happen.
const QUIET: Duration = Duration::from_millis(300);

async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept_ws(listener: &TcpListener) -> ServerWs {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("no client connected in time")
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Fast-cycling config so reconnect tests stay quick.
fn test_config(url: &str) -> ClientConfig {
    ClientConfig {
        url: url.to_string(),
        debounce: Duration::from_millis(10),
        backoff: BackoffConfig {
            base_delay_ms: 50,
            max_delay_ms: 200,
        },
    }
}

async fn wait_open(controller: &ReactiveSearchController) {
    let mut state = controller.connection_state();
    let _ = tokio::time::timeout(WAIT, state.wait_for(|s| s.is_open()))
        .await
        .expect("channel did not open in time")
        .unwrap();
}

async fn next_text(ws: &mut ServerWs) -> String {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("no frame arrived in time")
            .expect("connection ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return text.to_string();
        }
    }
}

#[tokio::test]
async fn opens_sends_query_and_renders_results() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;

    controller.on_input_changed("rust");
    assert_eq!(next_text(&mut server).await, "rust");

    server
        .send(Message::Text(
            r#"[{"id":"1","title":"T","score":0.5}]"#.into(),
        ))
        .await
        .unwrap();

    let mut results = controller.results();
    let _ = tokio::time::timeout(WAIT, results.wait_for(|set| !set.is_empty()))
        .await
        .expect("results did not arrive")
        .unwrap();
    let set = results.borrow().clone();
    assert_eq!(set.len(), 1);
    assert_eq!(set[0].id, "1");
    assert_eq!(set[0].title, "T");
    assert!(set[0].description.is_none());

    controller.teardown();
}

#[tokio::test]
async fn debounce_sends_only_the_settled_text() {
    let (listener, url) = bind_server().await;
    let mut config = test_config(&url);
    config.debounce = Duration::from_millis(120);
    let controller = ReactiveSearchController::new(config);
    controller.open();
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;

    controller.on_input_changed("a");
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.on_input_changed("ab");

    assert_eq!(next_text(&mut server).await, "ab");
    // And nothing else: "a" was superseded before its timer fired.
    let extra = tokio::time::timeout(QUIET, server.next()).await;
    assert!(extra.is_err(), "unexpected second frame: {extra:?}");

    controller.teardown();
}

#[tokio::test]
async fn clearing_input_cancels_the_pending_query() {
    let (listener, url) = bind_server().await;
    let mut config = test_config(&url);
    config.debounce = Duration::from_millis(120);
    let controller = ReactiveSearchController::new(config);
    controller.open();
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;

    controller.on_input_changed("doomed");
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.on_input_changed("");

    let extra = tokio::time::timeout(QUIET, server.next()).await;
    assert!(extra.is_err(), "query escaped after input was cleared");
    assert!(controller.results().borrow().is_empty());

    controller.teardown();
}

#[tokio::test]
async fn results_are_replaced_wholesale() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;

    server
        .send(Message::Text(
            r#"[{"id":"1","title":"one","score":0.9},{"id":"2","title":"two","score":0.8}]"#
                .into(),
        ))
        .await
        .unwrap();
    let mut results = controller.results();
    let _ = tokio::time::timeout(WAIT, results.wait_for(|set| set.len() == 2))
        .await
        .expect("first set did not arrive")
        .unwrap();

    server
        .send(Message::Text(
            r#"[{"id":"9","title":"nine","score":0.1}]"#.into(),
        ))
        .await
        .unwrap();
    let _ = tokio::time::timeout(WAIT, results.wait_for(|set| set.len() == 1))
        .await
        .expect("replacement set did not arrive")
        .unwrap();
    assert_eq!(results.borrow()[0].id, "9");

    controller.teardown();
}

#[tokio::test]
async fn malformed_payloads_change_nothing() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;

    for junk in ["not json", r#"{"id":"1","title":"T","score":1.0}"#, "42"] {
        server.send(Message::Text(junk.into())).await.unwrap();
    }
    // A valid push after the junk proves the connection survived it all.
    server
        .send(Message::Text(
            r#"[{"id":"ok","title":"fine","score":1.0}]"#.into(),
        ))
        .await
        .unwrap();

    let mut results = controller.results();
    let _ = tokio::time::timeout(WAIT, results.wait_for(|set| !set.is_empty()))
        .await
        .expect("valid set did not arrive")
        .unwrap();
    assert_eq!(results.borrow()[0].id, "ok");
    assert!(controller.connection_state().borrow().is_open());

    controller.teardown();
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let server = accept_ws(&listener).await;
    wait_open(&controller).await;

    let dropped_at = Instant::now();
    drop(server);

    let mut state = controller.connection_state();
    let _ = tokio::time::timeout(WAIT, state.wait_for(|s| !s.is_open()))
        .await
        .expect("disconnect was not observed")
        .unwrap();

    // The session redials on its own; no user action required.
    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;
    assert!(
        dropped_at.elapsed() >= Duration::from_millis(40),
        "reconnect ignored the backoff delay"
    );

    // The recovered channel still carries queries.
    controller.on_input_changed("again");
    assert_eq!(next_text(&mut server).await, "again");

    controller.teardown();
}

#[tokio::test]
async fn backoff_counter_resets_after_successful_reopen() {
    let (listener, url) = bind_server().await;
    let mut config = test_config(&url);
    // Wide spacing between the schedule's steps so the timing assertion
    // below can tell "base delay" (300ms) from "escalated delay" (600ms).
    config.backoff = BackoffConfig {
        base_delay_ms: 300,
        max_delay_ms: 4800,
    };
    let controller = ReactiveSearchController::new(config);
    controller.open();
    let server = accept_ws(&listener).await;
    wait_open(&controller).await;

    // First disconnect episode: one backoff cycle runs, then the reopen
    // succeeds — which must reset the attempt counter to zero.
    drop(server);
    let server = accept_ws(&listener).await;
    wait_open(&controller).await;

    // Second episode: a fresh counter means the redial arrives after the
    // base delay again, not the doubled one the old counter would give.
    drop(server);
    let dropped_at = Instant::now();
    let _server = accept_ws(&listener).await;
    let elapsed = dropped_at.elapsed();
    assert!(
        elapsed >= Duration::from_millis(250),
        "redial ignored the backoff delay entirely: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(550),
        "redial used an escalated delay, counter was not reset: {elapsed:?}"
    );

    controller.teardown();
}

#[tokio::test]
async fn queries_issued_while_disconnected_are_dropped() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let server = accept_ws(&listener).await;
    wait_open(&controller).await;
    drop(server);

    let mut state = controller.connection_state();
    let _ = tokio::time::timeout(WAIT, state.wait_for(|s| !s.is_open()))
        .await
        .expect("disconnect was not observed")
        .unwrap();

    // Typed while disconnected: dropped, never queued for the reconnect.
    controller.on_input_changed("late");

    let mut server = accept_ws(&listener).await;
    wait_open(&controller).await;
    let extra = tokio::time::timeout(QUIET, server.next()).await;
    assert!(extra.is_err(), "a disconnected-era query was replayed");

    controller.teardown();
}

#[tokio::test]
async fn teardown_stops_reconnection_for_good() {
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();
    let _server = accept_ws(&listener).await;
    wait_open(&controller).await;

    controller.teardown();
    let mut state = controller.connection_state();
    let _ = tokio::time::timeout(WAIT, state.wait_for(|s| *s == strand_core::ConnectionState::Closed))
        .await
        .expect("teardown did not close the channel")
        .unwrap();

    // No redial, ever.
    let redial = tokio::time::timeout(QUIET, listener.accept()).await;
    assert!(redial.is_err(), "session redialed after teardown");
}

#[tokio::test]
async fn teardown_while_connecting_goes_straight_to_closed() {
    // A listener that never completes the WebSocket handshake keeps the
    // session parked in Connecting.
    let (listener, url) = bind_server().await;
    let controller = ReactiveSearchController::new(test_config(&url));
    controller.open();

    let mut state = controller.connection_state();
    let _ = tokio::time::timeout(
        WAIT,
        state.wait_for(|s| *s == strand_core::ConnectionState::Connecting),
    )
    .await
    .expect("session never started connecting")
    .unwrap();

    controller.teardown();
    let _ = tokio::time::timeout(
        WAIT,
        state.wait_for(|s| *s == strand_core::ConnectionState::Closed),
    )
    .await
    .expect("teardown did not close the channel")
    .unwrap();

    tokio::time::sleep(QUIET).await;
    assert_eq!(
        *state.borrow(),
        strand_core::ConnectionState::Closed,
        "state moved again after terminal teardown"
    );
    drop(listener);
}

#[tokio::test]
async fn reconfigure_endpoint_switches_servers() {
    let (listener_a, url_a) = bind_server().await;
    let (listener_b, url_b) = bind_server().await;

    let mut controller = ReactiveSearchController::new(test_config(&url_a));
    controller.open();
    let mut server_a = accept_ws(&listener_a).await;
    wait_open(&controller).await;

    controller.reconfigure_endpoint(&url_b);
    let mut server_b = accept_ws(&listener_b).await;
    wait_open(&controller).await;

    // The old connection is gone: at most a close frame remains.
    let leftover = tokio::time::timeout(WAIT, server_a.next()).await.unwrap();
    assert!(
        matches!(leftover, None | Some(Ok(Message::Close(_)))),
        "old endpoint still live: {leftover:?}"
    );

    controller.on_input_changed("switched");
    assert_eq!(next_text(&mut server_b).await, "switched");

    controller.teardown();
}
