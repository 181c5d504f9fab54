//! Chat commands.

use anyhow::Result;
use tgsim_core::preferences::ViewMode;

use super::{ApiContext, Context, print_json};

/// List all chats.
pub async fn list(ctx: &Context) -> Result<()> {
    let chats = ctx.client.list_chats().await.api_context("Listing chats")?;

    if ctx.view == ViewMode::Json {
        return print_json(&chats);
    }

    if chats.is_empty() {
        println!("No chats found.");
        return Ok(());
    }

    println!("{:<12} {:<32} BOTS", "ID", "TITLE");
    println!("{:<12} {:<32} ----", "--", "-----");
    for chat in &chats {
        let bots = chat
            .bot_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<12} {:<32} {}", chat.id.to_string(), chat.title, bots);
    }
    Ok(())
}
