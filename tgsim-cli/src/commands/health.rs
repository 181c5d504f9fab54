//! Health command - show backend health.

use anyhow::Result;
use tgsim_core::preferences::ViewMode;

use super::{ApiContext, Context, cell, print_json};

/// Run the health command.
pub async fn run(ctx: &Context) -> Result<()> {
    let health = ctx.client.health().await.api_context("Health check")?;

    if ctx.view == ViewMode::Json {
        return print_json(&health);
    }

    let marker = if health.is_healthy() { "OK" } else { "DEGRADED" };
    println!("Backend:  {}", ctx.client.base_url());
    println!("Status:   {} ({})", health.status, marker);
    for (key, value) in &health.extra {
        println!("  {:<20} {}", key, cell(value));
    }
    Ok(())
}
