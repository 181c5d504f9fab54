//! Bot management operations.

use crate::client::Client;
use crate::error::Result;
use crate::types::{Bot, EntityId, Listing, NewBot};

impl Client {
    /// List all bots.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tgsim_client::Client;
    /// # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
    /// for bot in client.list_bots().await? {
    ///     println!("{} {}", bot.id, bot.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_bots(&self) -> Result<Vec<Bot>> {
        let listing: Listing<Bot> = self.get_json("bots").await?;
        Ok(listing.into_vec())
    }

    /// Get a single bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot doesn't exist or the request fails.
    pub async fn get_bot(&self, id: &EntityId) -> Result<Bot> {
        self.get_json(&bot_path(id)).await
    }

    /// Create a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the payload or the request fails.
    pub async fn create_bot(&self, bot: &NewBot) -> Result<Bot> {
        self.post_json("bots", bot).await
    }

    /// Delete a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot doesn't exist or the request fails.
    pub async fn delete_bot(&self, id: &EntityId) -> Result<()> {
        self.delete(&bot_path(id)).await
    }
}

fn bot_path(id: &EntityId) -> String {
    format!("bots/{}", urlencoding::encode(&id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_path_encodes_segment() {
        assert_eq!(bot_path(&EntityId::Int(5)), "bots/5");
        assert_eq!(bot_path(&EntityId::Text("a b/c".into())), "bots/a%20b%2Fc");
    }
}
