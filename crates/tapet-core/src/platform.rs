//! Host-provided capabilities consumed by the rotation engine.
//!
//! These are object-safe so a host can wire in whatever implementation it
//! has at runtime (or none: see the no-op impls in `tapet-daemon`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
  crop::{Detection, Rect},
  prefs::Targets,
  wallpaper::{Resolution, Wallpaper},
};

/// Error returned by host capabilities. The engine only logs or classifies
/// these, so their concrete type is the host's business.
pub type PlatformError = Box<dyn std::error::Error + Send + Sync>;

/// The screen a wallpaper is being applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
  pub name:       String,
  pub resolution: Resolution,
}

#[async_trait]
pub trait FavoritesProvider: Send + Sync {
  /// A uniformly random favorite, or `None` if there are none.
  async fn random_favorite(&self) -> Result<Option<Wallpaper>, PlatformError>;

  /// Mark a wallpaper as favorite. Idempotent.
  async fn add_favorite(&self, wallpaper: &Wallpaper) -> Result<(), PlatformError>;
}

#[async_trait]
pub trait LocalProvider: Send + Sync {
  /// A uniformly random wallpaper among the accessible folders.
  async fn random_local_wallpaper(
    &self,
    dirs: &[PathBuf],
  ) -> Result<Option<Wallpaper>, PlatformError>;
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
  /// Locate the main subject of an image. Advisory only.
  async fn detect(&self, image: &Path) -> Result<Option<Detection>, PlatformError>;
}

#[async_trait]
pub trait WallpaperSetter: Send + Sync {
  /// The display wallpapers are applied to.
  fn display(&self) -> Display;

  /// Apply `image` cropped to `crop`. Returns `false` if the platform
  /// refused it.
  async fn set_wallpaper(
    &self,
    display: &Display,
    image: &Path,
    crop: Rect,
    targets: Targets,
  ) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
  /// Announce a newly applied wallpaper.
  async fn notify(&self, wallpaper: &Wallpaper, image: &Path) -> Result<(), PlatformError>;
}
