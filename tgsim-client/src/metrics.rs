//! Health and metrics queries.
//!
//! `metrics()` is also what the feed polls when the realtime stream is
//! unavailable.

use crate::client::Client;
use crate::error::Result;
use crate::types::{HealthStatus, MetricsSnapshot};

impl Client {
    /// Get backend health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health").await
    }

    /// Get the current metrics snapshot.
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
    /// let snapshot = client.metrics().await?;
    /// for (name, value) in &snapshot.values {
    ///     println!("{name}: {value}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.get_json("metrics").await
    }
}
