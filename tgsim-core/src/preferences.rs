//! Persisted UI preferences.
//!
//! Each preference lives under its own key. A missing or unparsable entry
//! yields that field's default without affecting the others.

use crate::error::{CoreError, Result};
use crate::providers::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store key for the listing view mode.
pub const VIEW_MODE_KEY: &str = "tgsim.prefs.view_mode";

/// Store key for the colour theme.
pub const THEME_KEY: &str = "tgsim.prefs.theme";

/// How listings are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Aligned columns.
    #[default]
    Table,
    /// Raw JSON documents.
    Json,
}

/// Colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follow the terminal.
    #[default]
    System,
    /// Light palette.
    Light,
    /// Dark palette.
    Dark,
}

impl FromStr for ViewMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(CoreError::Config {
                key: VIEW_MODE_KEY.to_string(),
                cause: format!("unknown view mode '{other}'"),
            }),
        }
    }
}

impl FromStr for Theme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(CoreError::Config {
                key: THEME_KEY.to_string(),
                cause: format!("unknown theme '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Json => "json",
        })
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

/// The full set of persisted preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    /// Listing view mode.
    pub view_mode: ViewMode,
    /// Colour theme.
    pub theme: Theme,
}

impl Preferences {
    /// Load preferences, falling back to defaults per field.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            view_mode: load_json(store, VIEW_MODE_KEY),
            theme: load_json(store, THEME_KEY),
        }
    }

    /// Persist all preferences.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        save_json(store, VIEW_MODE_KEY, &self.view_mode)?;
        save_json(store, THEME_KEY, &self.theme)
    }
}

/// Read a JSON-encoded value, returning the default when absent or corrupted.
pub fn load_json<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::debug!(key, error = %e, "Ignoring corrupted preference");
        T::default()
    })
}

/// Write a value as JSON.
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let encoded = serde_json::to_string(value).map_err(|e| CoreError::Encode {
        key: key.to_string(),
        cause: e.to_string(),
    })?;
    store.set(key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryStore;

    #[test]
    fn defaults_when_empty() {
        let store = MemoryStore::new();
        assert_eq!(Preferences::load(&store), Preferences::default());
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let prefs = Preferences {
            view_mode: ViewMode::Json,
            theme: Theme::Dark,
        };
        prefs.save(&store).unwrap();

        assert_eq!(store.get(VIEW_MODE_KEY).as_deref(), Some("\"json\""));
        assert_eq!(Preferences::load(&store), prefs);
    }

    #[test]
    fn corrupted_field_falls_back_alone() {
        let store =
            MemoryStore::from_pairs(&[(VIEW_MODE_KEY, "\"json\""), (THEME_KEY, "{broken")]);

        let prefs = Preferences::load(&store);
        assert_eq!(prefs.view_mode, ViewMode::Json);
        assert_eq!(prefs.theme, Theme::System);
    }

    #[test]
    fn parse_from_cli_strings() {
        assert_eq!("JSON".parse::<ViewMode>().unwrap(), ViewMode::Json);
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }
}
