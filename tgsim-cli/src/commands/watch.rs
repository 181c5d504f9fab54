//! Watch command - follow live metrics.
//!
//! Streams over the realtime connection when it is enabled and falls back
//! to polling the metrics endpoint whenever the stream is unavailable.

use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tgsim_client::realtime::{ConnectionManager, WsConnector};
use tgsim_client::{FeedMode, FeedUpdate, MetricsFeed};
use tgsim_core::preferences::ViewMode;
use tgsim_core::providers::{ClockProvider, RealClock};

use super::metrics::print_snapshot;
use super::{Context, LOGIN_HINT, cell};

/// Run the watch command until Ctrl+C.
pub async fn run(ctx: &Context, no_realtime: bool, poll_secs: Option<u64>) -> Result<()> {
    if !ctx.session.is_set() {
        bail!("No API key configured; {LOGIN_HINT}");
    }

    let poll_interval = poll_secs
        .map(Duration::from_secs)
        .unwrap_or(ctx.config.poll_interval)
        .max(Duration::from_secs(1));
    let clock: Arc<dyn ClockProvider> = Arc::new(RealClock::new());

    let manager = if ctx.config.realtime && !no_realtime {
        let url = ctx.config.stream_url();
        if url.is_none() {
            tracing::warn!(api_url = %ctx.config.api_url, "Cannot derive a stream URL, polling only");
        }
        Some(ConnectionManager::spawn(
            url,
            ctx.config.reconnect.clone(),
            Arc::new(WsConnector::new()),
            Arc::clone(&clock),
        ))
    } else {
        None
    };

    let (feed, mut updates) =
        MetricsFeed::spawn(ctx.client.clone(), manager, poll_interval, clock);

    eprintln!("Watching metrics from {} (Ctrl+C to stop)", ctx.client.base_url());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                eprintln!("Stopped.");
                break;
            }
            update = updates.recv() => match update {
                Some(FeedUpdate::AuthRequired) => {
                    feed.stop();
                    bail!("The backend rejected the API key; {LOGIN_HINT}");
                }
                Some(update) => print_update(&update, ctx.view)?,
                None => break,
            },
        }
    }

    feed.stop();
    Ok(())
}

fn print_update(update: &FeedUpdate, view: ViewMode) -> Result<()> {
    match update {
        FeedUpdate::Mode(FeedMode::Streaming) => eprintln!("-- streaming live metrics"),
        FeedUpdate::Mode(FeedMode::Polling) => eprintln!("-- polling metrics"),
        FeedUpdate::Live(value) => match view {
            ViewMode::Json => println!("{}", serde_json::to_string(value)?),
            ViewMode::Table => print_live(value),
        },
        FeedUpdate::Polled(snapshot) => match view {
            ViewMode::Json => println!("{}", serde_json::to_string(snapshot)?),
            ViewMode::Table => print_snapshot(snapshot),
        },
        FeedUpdate::PollFailed {
            code,
            message,
            retryable,
        } => {
            let note = if *retryable { "will retry" } else { "continuing" };
            eprintln!("Poll failed ({code}, {note}): {message}");
        }
        FeedUpdate::AuthRequired => {}
    }
    Ok(())
}

fn print_live(value: &serde_json::Value) {
    match value.as_object() {
        Some(fields) => {
            let line = fields
                .iter()
                .map(|(name, value)| format!("{name}={}", cell(value)))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        None => println!("{}", cell(value)),
    }
}
