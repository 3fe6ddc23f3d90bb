//! Persisted presentation preferences.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, MemoryStore, THEME_KEY, decode_blob, load_logged, persist_logged};

/// Colour scheme requested by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light scheme.
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

impl ThemeMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn from_legacy(value: &str) -> Option<Self> {
        match value.trim() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedTheme {
    is_dark: bool,
}

/// Theme preference backed by a [`KeyValueStore`].
#[derive(Clone)]
pub struct PreferenceStore {
    theme: Arc<Mutex<ThemeMode>>,
    storage: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    /// Rehydrate from `storage`; unusable values fall back to [`ThemeMode::Light`].
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let theme = load_logged(storage.as_ref(), THEME_KEY)
            .map_or_else(ThemeMode::default, |raw| rehydrate(&raw));
        Self {
            theme: Arc::new(Mutex::new(theme)),
            storage,
        }
    }

    /// Preference store backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new()))
    }

    /// Current mode.
    #[must_use]
    pub fn theme(&self) -> ThemeMode {
        *self.theme.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the dark scheme is active.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.theme() == ThemeMode::Dark
    }

    /// Replace the mode and persist it.
    pub fn set_theme(&self, mode: ThemeMode) {
        self.update(|_| mode);
    }

    /// Flip the mode, persist it, and return the new value.
    pub fn toggle_theme(&self) -> ThemeMode {
        self.update(ThemeMode::toggled)
    }

    fn update(&self, next: impl FnOnce(ThemeMode) -> ThemeMode) -> ThemeMode {
        let mut theme = self.theme.lock().unwrap_or_else(PoisonError::into_inner);
        *theme = next(*theme);
        persist_logged(
            self.storage.as_ref(),
            THEME_KEY,
            &PersistedTheme {
                is_dark: *theme == ThemeMode::Dark,
            },
        );
        tracing::debug!(theme = %*theme, "theme preference updated");
        *theme
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PreferenceStore")
            .field("theme", &self.theme())
            .finish_non_exhaustive()
    }
}

fn rehydrate(raw: &str) -> ThemeMode {
    if let Some(mode) = ThemeMode::from_legacy(raw) {
        return mode;
    }
    match decode_blob::<PersistedTheme>(raw) {
        Ok(persisted) if persisted.is_dark => ThemeMode::Dark,
        Ok(_) => ThemeMode::Light,
        Err(defect) => {
            tracing::warn!(defect = %defect.describe(), "persisted theme unreadable; using light");
            ThemeMode::default()
        }
    }
}
