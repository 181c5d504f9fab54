//! Preference commands.

use anyhow::{Context as _, Result};
use tgsim_core::preferences::{Preferences, Theme, ViewMode};
use tgsim_core::providers::KeyValueStore;

use super::print_json;

/// Print saved preferences.
pub fn show(store: &dyn KeyValueStore, view: ViewMode) -> Result<()> {
    let prefs = Preferences::load(store);

    if view == ViewMode::Json {
        return print_json(&serde_json::json!({
            "view_mode": prefs.view_mode,
            "theme": prefs.theme,
        }));
    }

    println!("View mode:  {}", prefs.view_mode);
    println!("Theme:      {}", prefs.theme);
    Ok(())
}

/// Change preferences; unspecified ones keep their value.
pub fn set(store: &dyn KeyValueStore, view: Option<ViewMode>, theme: Option<Theme>) -> Result<()> {
    let mut prefs = Preferences::load(store);
    if let Some(view) = view {
        prefs.view_mode = view;
    }
    if let Some(theme) = theme {
        prefs.theme = theme;
    }
    prefs.save(store).context("Failed to save preferences")?;

    println!("View mode:  {}", prefs.view_mode);
    println!("Theme:      {}", prefs.theme);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgsim_core::providers::MemoryStore;

    #[test]
    fn set_keeps_unspecified_fields() {
        let store = MemoryStore::new();
        set(&store, Some(ViewMode::Json), None).unwrap();
        set(&store, None, Some(Theme::Dark)).unwrap();

        let prefs = Preferences::load(&store);
        assert_eq!(prefs.view_mode, ViewMode::Json);
        assert_eq!(prefs.theme, Theme::Dark);
    }
}
