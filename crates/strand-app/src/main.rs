//! # strand-app
//!
//! Thin terminal front end for the Strand search client. All real protocol
//! and timing logic lives in `strand-client`; this binary only feeds input
//! lines into the controller and renders what it observes — the connection
//! status glyph and the current result table.

#![deny(unsafe_code)]

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use strand_client::{ClientConfig, ReactiveSearchController};
use strand_core::{ConnectionState, SearchResult};
use strand_settings::load_settings;

/// Reactive search over a live WebSocket channel.
#[derive(Parser, Debug)]
#[command(name = "strand", about = "Reactive search over a live WebSocket channel")]
struct Cli {
    /// Endpoint URL (overrides settings file and STRAND_WS_URL).
    #[arg(long)]
    url: Option<String>,

    /// Debounce window in milliseconds (overrides settings).
    #[arg(long)]
    debounce_ms: Option<u64>,
}

fn status_glyph(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "🟡",
        ConnectionState::Open => "🟢",
        ConnectionState::Closing => "🟠",
        ConnectionState::Closed => "🔴",
    }
}

fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results".to_string();
    }
    let mut out = format!("{:<12} {:<40} {:>8}", "ID", "TITLE", "SCORE");
    for result in results {
        let _ = write!(
            out,
            "\n{:<12} {:<40} {:>8.4}",
            result.id, result.title, result.score
        );
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings().context("loading settings")?;

    let mut config = ClientConfig {
        url: settings.ws_url,
        debounce: Duration::from_millis(settings.debounce_ms),
        backoff: settings.backoff,
    };
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(ms) = cli.debounce_ms {
        config.debounce = Duration::from_millis(ms);
    }

    info!(url = %config.url, debounce = ?config.debounce, "starting strand");
    let mut controller = ReactiveSearchController::new(config);
    controller.open();

    // Status line on every lifecycle transition.
    let mut state = controller.connection_state();
    let status = tokio::spawn(async move {
        loop {
            let current = *state.borrow_and_update();
            eprintln!("{} {current}", status_glyph(current));
            if state.changed().await.is_err() {
                break;
            }
        }
    });

    // Result table on every delivery (and on every clear).
    let mut results = controller.results();
    let table = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let set = results.borrow().clone();
            println!("{}", format_results(&set));
        }
    });

    eprintln!("Type to search; ':url <ws-url>' switches endpoint; Ctrl-D quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if let Some(url) = line.strip_prefix(":url ") {
            controller.reconfigure_endpoint(url.trim());
            continue;
        }
        debug!(len = line.len(), "input changed");
        controller.on_input_changed(&line);
    }

    info!("stdin closed, shutting down");
    controller.teardown();
    status.abort();
    table.abort();
    Ok(())
}
