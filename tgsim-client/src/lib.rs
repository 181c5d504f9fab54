//! Typed client for the Telegram chat-simulation backend.
//!
//! This crate is the data layer of the dashboard: an authenticated REST
//! client, a realtime metrics stream with automatic reconnects, and a feed
//! that falls back to polling when the stream is unavailable.
//!
//! # Features
//!
//! - Credential injection from a persisted session
//! - Typed failures with a closed set of classification codes
//! - Per-request timeouts and caller-driven cancellation
//! - Bot, chat, health and metrics endpoints
//! - Realtime stream with bounded linear backoff and keep-alive pings
//! - Metrics feed that switches between streaming and polling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tgsim_client::{Client, NewBot};
//! use tgsim_core::providers::MemoryStore;
//! use tgsim_core::session::SessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionStore::new(Arc::new(MemoryStore::new()));
//! session.set("my-secret-key")?;
//! let client = Client::new("http://localhost:8000/api", session)?;
//!
//! let bot = client
//!     .create_bot(&NewBot {
//!         name: "Alice".into(),
//!         ..NewBot::default()
//!     })
//!     .await?;
//! println!("Created bot {}", bot.id);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All requests return `Result<T, ClientError>`. Every error carries an
//! [`ErrorCode`]:
//!
//! ```no_run
//! # use tgsim_client::{Client, ErrorCode};
//! # async fn example(client: Client) {
//! match client.list_bots().await {
//!     Ok(bots) => println!("{} bots", bots.len()),
//!     Err(e) if e.code() == ErrorCode::Http(401) => eprintln!("Please log in again"),
//!     Err(e) => eprintln!("Error ({}): {e}", e.code()),
//! }
//! # }
//! ```

#![warn(missing_docs)]

mod bots;
mod chats;
mod client;
mod error;
mod metrics;
mod request;
mod transport;
mod types;

pub mod feed;
pub mod realtime;

pub use client::Client;
pub use error::{ClientError, ErrorCode, Result, TransportError};
pub use feed::{FeedHandle, FeedMode, FeedUpdate, MetricsFeed};
pub use realtime::{ConnectionManager, ConnectionState, RealtimeError};
pub use request::{AbortController, AbortSignal, Body, Credentials, RequestOptions};
pub use transport::{
    MockReply, MockTransport, ReqwestTransport, Response, Transport, TransportFuture,
    TransportRequest,
};
pub use types::{Bot, Chat, EntityId, HealthStatus, MetricsSnapshot, NewBot};
