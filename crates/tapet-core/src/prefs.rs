//! Auto-wallpaper preferences, persisted in the key-value preference store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which screens a wallpaper is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Targets {
  pub home: bool,
  pub lock: bool,
}

impl Default for Targets {
  fn default() -> Self { Self { home: true, lock: true } }
}

/// User configuration for the rotation engine.
///
/// Missing fields deserialise to their defaults so older stored blobs keep
/// loading after new fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoWallpaperPreferences {
  pub enabled:              bool,
  pub saved_search_enabled: bool,
  pub saved_search_id:      Option<i64>,
  pub favorites_enabled:    bool,
  pub local_enabled:        bool,
  pub local_dirs:           Vec<PathBuf>,
  pub use_object_detection: bool,
  pub targets:              Targets,
  /// Mark every applied wallpaper as a favorite.
  pub mark_favorite:        bool,
  /// Copy every applied remote wallpaper into the public downloads folder.
  pub download:             bool,
  pub show_notification:    bool,
  /// Minutes between scheduled rotations.
  pub frequency:            u64,
}

impl Default for AutoWallpaperPreferences {
  fn default() -> Self {
    Self {
      enabled:              false,
      saved_search_enabled: false,
      saved_search_id:      None,
      favorites_enabled:    false,
      local_enabled:        false,
      local_dirs:           Vec::new(),
      use_object_detection: false,
      targets:              Targets::default(),
      mark_favorite:        false,
      download:             false,
      show_notification:    false,
      frequency:            4 * 60,
    }
  }
}

impl AutoWallpaperPreferences {
  /// Local folders only count as a source once at least one is configured.
  pub fn local_source_usable(&self) -> bool {
    self.local_enabled && !self.local_dirs.is_empty()
  }

  pub fn any_source_enabled(&self) -> bool {
    self.saved_search_enabled
      || self.favorites_enabled
      || self.local_source_usable()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_blob_fills_defaults() {
    let prefs: AutoWallpaperPreferences =
      serde_json::from_str(r#"{"enabled": true, "favorites_enabled": true}"#)
        .unwrap();
    assert!(prefs.enabled);
    assert!(prefs.any_source_enabled());
    assert_eq!(prefs.targets, Targets { home: true, lock: true });
    assert_eq!(prefs.frequency, 240);
  }

  #[test]
  fn local_without_folders_is_not_a_source() {
    let prefs = AutoWallpaperPreferences {
      local_enabled: true,
      ..Default::default()
    };
    assert!(!prefs.any_source_enabled());
  }
}
