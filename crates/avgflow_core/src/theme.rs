use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

pub const THEME_KEY: &str = "avgflow-theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const ALL: [Theme; 2] = [Theme::Light, Theme::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme `{other}`")),
        }
    }
}

/// Whatever displays the theme: a document root, a toolkit context.
pub trait ThemeSurface {
    fn apply(&mut self, theme: Theme);
}

/// Class list of the root element. Holds at most one theme marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRoot {
    markers: BTreeSet<String>,
}

impl DocumentRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_marker(&mut self, marker: impl Into<String>) {
        self.markers.insert(marker.into());
    }

    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    pub fn theme_markers(&self) -> Vec<Theme> {
        Theme::ALL
            .into_iter()
            .filter(|theme| self.markers.contains(theme.as_str()))
            .collect()
    }
}

impl ThemeSurface for DocumentRoot {
    fn apply(&mut self, theme: Theme) {
        for candidate in Theme::ALL {
            self.markers.remove(candidate.as_str());
        }
        self.markers.insert(theme.as_str().to_string());
    }
}

pub struct ThemeStore<S: ThemeSurface> {
    theme: Theme,
    storage: Arc<dyn KeyValueStore>,
    surface: S,
}

impl<S: ThemeSurface> ThemeStore<S> {
    /// Reads the persisted theme once and applies it to `surface`.
    pub fn load(storage: Arc<dyn KeyValueStore>, mut surface: S) -> Self {
        let theme = match storage.get(THEME_KEY) {
            Some(raw) => raw.parse::<Theme>().unwrap_or_else(|err: String| {
                warn!(%err, "ignoring persisted theme");
                Theme::default()
            }),
            None => Theme::default(),
        };
        debug!(%theme, "theme loaded");
        surface.apply(theme);
        Self {
            theme,
            storage,
            surface,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn toggle(&mut self) -> Theme {
        self.set(self.theme.toggled());
        self.theme
    }

    pub fn set(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(err) = self.storage.set(THEME_KEY, theme.as_str()) {
            warn!(%err, %theme, "theme not persisted");
        }
        self.surface.apply(theme);
        debug!(%theme, "theme changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "prefs.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn defaults_to_light_without_persisted_value() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = ThemeStore::load(storage, DocumentRoot::new());
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(store.surface().theme_markers(), vec![Theme::Light]);
    }

    #[test]
    fn invalid_persisted_value_falls_back_to_light() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(THEME_KEY, "sepia").unwrap();
        let store = ThemeStore::load(storage, DocumentRoot::new());
        assert_eq!(store.theme(), Theme::Light);
    }

    #[test]
    fn toggle_persists_and_keeps_a_single_marker() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut root = DocumentRoot::new();
        root.add_marker("tet-decorations");
        let mut store = ThemeStore::load(Arc::clone(&storage), root);

        assert_eq!(store.toggle(), Theme::Dark);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(store.surface().theme_markers(), vec![Theme::Dark]);
        assert!(store.surface().markers().any(|m| m == "tet-decorations"));

        store.set(Theme::Light);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("light"));
        assert_eq!(store.surface().theme_markers(), vec![Theme::Light]);
    }

    #[test]
    fn persisted_value_is_restored() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        ThemeStore::load(Arc::clone(&storage), DocumentRoot::new()).toggle();
        let reloaded = ThemeStore::load(storage, DocumentRoot::new());
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[test]
    fn storage_failure_keeps_memory_value() {
        let mut store = ThemeStore::load(Arc::new(BrokenStore), DocumentRoot::new());
        assert_eq!(store.toggle(), Theme::Dark);
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.surface().theme_markers(), vec![Theme::Dark]);
    }
}
