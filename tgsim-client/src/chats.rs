//! Chat listing operations.

use crate::client::Client;
use crate::error::Result;
use crate::types::{Chat, Listing};

impl Client {
    /// List all simulated chats.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        let listing: Listing<Chat> = self.get_json("chats").await?;
        Ok(listing.into_vec())
    }
}
