//! The flat temp directory remote wallpapers are downloaded into.
//!
//! File names are a pure function of the URL, so every download path for the
//! same wallpaper lands on the same file.

use std::{
  io,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TempCache {
  dir: PathBuf,
}

impl TempCache {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// `hex(sha256(url))`, plus the URL's extension when it has one.
  pub fn file_name(url: &str) -> String {
    let hash = hex::encode(Sha256::digest(url.as_bytes()));
    match url_extension(url) {
      Some(ext) => format!("{hash}.{ext}"),
      None => hash,
    }
  }

  pub fn path_for(&self, url: &str) -> PathBuf { self.dir.join(Self::file_name(url)) }

  pub async fn ensure_dir(&self) -> io::Result<()> {
    tokio::fs::create_dir_all(&self.dir).await
  }

  /// Delete the temp file for `url`. `Ok(false)` if there was none.
  pub async fn remove(&self, url: &str) -> io::Result<bool> {
    remove_if_present(&self.path_for(url)).await
  }

  /// Delete every file last modified before `cutoff`. Files that cannot be
  /// inspected or removed are logged and skipped. Returns how many were
  /// deleted.
  pub async fn remove_older_than(&self, cutoff: DateTime<Utc>) -> io::Result<u64> {
    let mut entries = match tokio::fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
      Err(e) => return Err(e),
    };

    let mut deleted = 0;
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      let modified = match entry.metadata().await {
        Ok(meta) if meta.is_file() => meta.modified(),
        Ok(_) => continue,
        Err(e) => Err(e),
      };
      let modified: DateTime<Utc> = match modified {
        Ok(t) => t.into(),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "cannot read temp file mtime");
          continue;
        }
      };
      if modified >= cutoff {
        continue;
      }
      match tokio::fs::remove_file(&path).await {
        Ok(()) => {
          debug!(path = %path.display(), "removed stale temp file");
          deleted += 1;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "cannot remove temp file"),
      }
    }
    Ok(deleted)
  }
}

pub(crate) async fn remove_if_present(path: &Path) -> io::Result<bool> {
  match tokio::fs::remove_file(path).await {
    Ok(()) => Ok(true),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(e),
  }
}

/// Lowercased extension of the last path segment, ignoring query string and
/// fragment. Only short alphanumeric extensions count.
pub fn url_extension(url: &str) -> Option<String> {
  let path = url.split(['?', '#']).next().unwrap_or(url);
  let segment = path.rsplit('/').next()?;
  let (stem, ext) = segment.rsplit_once('.')?;
  if stem.is_empty()
    || ext.is_empty()
    || ext.len() > 5
    || !ext.chars().all(|c| c.is_ascii_alphanumeric())
  {
    return None;
  }
  Some(ext.to_ascii_lowercase())
}
