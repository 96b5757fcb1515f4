//! Local-folder wallpaper provider.
//!
//! Scans the configured folders recursively for images and picks one
//! uniformly. Folders that cannot be read are skipped with a warning.

use std::{
  fs,
  path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom as _;
use tapet_core::{
  platform::{LocalProvider, PlatformError},
  wallpaper::{Resolution, Source, Wallpaper},
};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, Default)]
pub struct FsLocalProvider;

#[async_trait]
impl LocalProvider for FsLocalProvider {
  async fn random_local_wallpaper(
    &self,
    dirs: &[PathBuf],
  ) -> Result<Option<Wallpaper>, PlatformError> {
    let dirs = dirs.to_vec();
    tokio::task::spawn_blocking(move || pick_local(&dirs)).await?
  }
}

fn pick_local(dirs: &[PathBuf]) -> Result<Option<Wallpaper>, PlatformError> {
  let mut images = Vec::new();
  for dir in dirs {
    collect_images(dir, dir, &mut images);
  }
  debug!(count = images.len(), "scanned local folders");

  let Some((folder, path)) = images.choose(&mut rand::rng()) else {
    return Ok(None);
  };

  let meta = fs::metadata(path)?;
  let (width, height) = image::image_dimensions(path)?;
  let created_at: DateTime<Utc> = meta.modified().map(Into::into).unwrap_or_else(|_| Utc::now());
  let path_str = path.to_string_lossy().into_owned();

  Ok(Some(Wallpaper {
    source:     Source::Local,
    source_id:  path_str.clone(),
    url:        path_str,
    file_size:  meta.len(),
    resolution: Resolution::new(width, height),
    created_at,
    metadata:   serde_json::json!({ "folder": folder.to_string_lossy() }),
  }))
}

fn collect_images(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, PathBuf)>) {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) => {
      warn!(dir = %dir.display(), error = %e, "cannot read local folder");
      return;
    }
  };

  for entry in entries.flatten() {
    let path = entry.path();
    match entry.file_type() {
      Ok(t) if t.is_dir() => collect_images(root, &path, out),
      Ok(t) if t.is_file() && is_image(&path) => out.push((root.to_path_buf(), path)),
      _ => {}
    }
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}
