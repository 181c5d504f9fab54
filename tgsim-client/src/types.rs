//! Type definitions for the tgsim client.
//!
//! The backend is loosely typed: ids arrive as numbers or strings, and
//! records carry more fields than the client cares about. Unknown fields are
//! kept in `extra` so JSON output shows the whole record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a backend entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric id.
    Int(i64),
    /// String id.
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        id.parse().map(Self::Int).unwrap_or_else(|_| Self::Text(id.to_string()))
    }
}

/// A simulated Telegram bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    /// Bot identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Telegram username, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Whether the bot is taking part in simulations.
    #[serde(default)]
    pub is_active: bool,
    /// Remaining fields as sent by the backend.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload for creating a bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBot {
    /// Display name.
    pub name: String,
    /// Telegram username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Free-form persona description, interpreted server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// A simulated chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Chat identifier.
    pub id: EntityId,
    /// Chat title.
    #[serde(default)]
    pub title: String,
    /// Bots taking part in the chat.
    #[serde(default)]
    pub bot_ids: Vec<EntityId>,
    /// Remaining fields as sent by the backend.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Point-in-time metrics as returned by the REST endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Server timestamp, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Metric values keyed by name.
    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Health information for the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status (e.g., "ok").
    pub status: String,
    /// Remaining fields (component checks, versions).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealthStatus {
    /// Whether the backend reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "ok" | "healthy" | "up")
    }
}

/// A listing that may arrive bare or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "bots", alias = "chats", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_id_accepts_numbers_and_strings() {
        let n: EntityId = serde_json::from_value(json!(42)).unwrap();
        let s: EntityId = serde_json::from_value(json!("bot-7")).unwrap();
        assert_eq!(n, EntityId::Int(42));
        assert_eq!(s.to_string(), "bot-7");
        assert_eq!(EntityId::from("17"), EntityId::Int(17));
    }

    #[test]
    fn bot_keeps_unknown_fields() {
        let bot: Bot = serde_json::from_value(json!({
            "id": 1,
            "name": "Alice",
            "persona": "cheerful",
            "message_rate": 3
        }))
        .unwrap();

        assert_eq!(bot.name, "Alice");
        assert!(!bot.is_active);
        assert_eq!(bot.extra["persona"], "cheerful");
        assert_eq!(serde_json::to_value(&bot).unwrap()["message_rate"], 3);
    }

    #[test]
    fn listing_bare_and_wrapped() {
        let bare: Listing<EntityId> = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(bare.into_vec().len(), 2);

        let wrapped: Listing<EntityId> =
            serde_json::from_value(json!({ "bots": ["a"], "count": 1 })).unwrap();
        assert_eq!(wrapped.into_vec(), vec![EntityId::Text("a".into())]);
    }

    #[test]
    fn health_status_variants() {
        let health: HealthStatus = serde_json::from_value(json!({ "status": "OK" })).unwrap();
        assert!(health.is_healthy());
        let health: HealthStatus =
            serde_json::from_value(json!({ "status": "degraded" })).unwrap();
        assert!(!health.is_healthy());
    }
}
