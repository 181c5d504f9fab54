//! Bot commands.

use anyhow::Result;
use tgsim_client::{Bot, EntityId, NewBot};
use tgsim_core::preferences::ViewMode;

use super::{ApiContext, Context, print_json};

/// List all bots.
pub async fn list(ctx: &Context) -> Result<()> {
    let bots = ctx.client.list_bots().await.api_context("Listing bots")?;

    if ctx.view == ViewMode::Json {
        return print_json(&bots);
    }

    if bots.is_empty() {
        println!("No bots found.");
        return Ok(());
    }

    println!("{:<12} {:<24} {:<20} ACTIVE", "ID", "NAME", "USERNAME");
    println!("{:<12} {:<24} {:<20} ------", "--", "----", "--------");
    for bot in &bots {
        print_row(bot);
    }
    println!();
    println!("{} bots", bots.len());
    Ok(())
}

/// Show a single bot.
pub async fn get(ctx: &Context, id: &EntityId) -> Result<()> {
    let bot = ctx
        .client
        .get_bot(id)
        .await
        .api_context(&format!("Fetching bot {id}"))?;

    if ctx.view == ViewMode::Json {
        return print_json(&bot);
    }

    println!("ID:        {}", bot.id);
    println!("Name:      {}", bot.name);
    println!("Username:  {}", bot.username.as_deref().unwrap_or("-"));
    println!("Active:    {}", if bot.is_active { "yes" } else { "no" });
    for (key, value) in &bot.extra {
        println!("{:<10} {}", format!("{key}:"), super::cell(value));
    }
    Ok(())
}

/// Create a bot.
pub async fn create(
    ctx: &Context,
    name: String,
    username: Option<String>,
    persona: Option<String>,
) -> Result<()> {
    let new_bot = NewBot {
        name,
        username,
        persona,
    };
    let bot = ctx
        .client
        .create_bot(&new_bot)
        .await
        .api_context("Creating bot")?;

    tracing::info!(id = %bot.id, "Bot created");
    if ctx.view == ViewMode::Json {
        return print_json(&bot);
    }
    println!("Created bot {} ({})", bot.name, bot.id);
    Ok(())
}

/// Delete a bot.
pub async fn delete(ctx: &Context, id: &EntityId) -> Result<()> {
    ctx.client
        .delete_bot(id)
        .await
        .api_context(&format!("Deleting bot {id}"))?;
    println!("Deleted bot {id}");
    Ok(())
}

fn print_row(bot: &Bot) {
    println!(
        "{:<12} {:<24} {:<20} {}",
        bot.id.to_string(),
        bot.name,
        bot.username.as_deref().unwrap_or("-"),
        if bot.is_active { "yes" } else { "no" }
    );
}
