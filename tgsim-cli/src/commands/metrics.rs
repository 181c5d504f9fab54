//! Metrics command - print one snapshot.

use anyhow::Result;
use tgsim_client::MetricsSnapshot;
use tgsim_core::preferences::ViewMode;

use super::{ApiContext, Context, cell, print_json};

/// Run the metrics command.
pub async fn run(ctx: &Context) -> Result<()> {
    let snapshot = ctx.client.metrics().await.api_context("Fetching metrics")?;

    if ctx.view == ViewMode::Json {
        return print_json(&snapshot);
    }
    print_snapshot(&snapshot);
    Ok(())
}

/// Print a snapshot as a two-column table.
pub fn print_snapshot(snapshot: &MetricsSnapshot) {
    if let Some(timestamp) = &snapshot.timestamp {
        println!("Metrics at {timestamp}");
    }
    for (name, value) in &snapshot.values {
        println!("  {:<28} {}", name, cell(value));
    }
}
