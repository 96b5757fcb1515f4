//! The rotation engine: choose a source category, pick a wallpaper from it,
//! materialize it locally, apply it, then record it in the history ledger.
//!
//! Once a wallpaper has been applied the rotation counts as a success;
//! favoriting, copying to the downloads folder and notifying are best-effort
//! and only logged when they fail.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use rand::Rng as _;
use tapet_core::{
  clock::Clock,
  crop::compute_crop,
  history::{NewHistoryEntry, SourceChoice},
  platform::{FavoritesProvider, LocalProvider, Notifier, ObjectDetector, WallpaperSetter},
  prefs::AutoWallpaperPreferences,
  query::{SavedSearch, SearchQuery},
  source::{Downloader, SearchSource},
  store::WallpaperStore,
  wallpaper::{Source, Wallpaper},
};
use tracing::{debug, info, warn};

use crate::{
  download::download_verified,
  error::{LoadError, RotationError},
  mediator::RemoteMediator,
  pager::{QueryPager, DEFAULT_BATCH_SIZE},
  tempfiles::{url_extension, TempCache},
};

/// Platform-facing collaborators, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
  pub favorites: Arc<dyn FavoritesProvider>,
  pub local:     Arc<dyn LocalProvider>,
  pub detector:  Option<Arc<dyn ObjectDetector>>,
  pub setter:    Arc<dyn WallpaperSetter>,
  pub notifier:  Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationRequest {
  /// Rotate even when auto wallpaper is disabled.
  pub force: bool,
}

#[derive(Debug, Clone)]
pub struct RotationSuccess {
  pub wallpaper:     Wallpaper,
  pub source_choice: SourceChoice,
  pub path:          PathBuf,
}

/// An enabled category, carrying what it needs to produce a candidate.
enum Pool {
  SavedSearch(SavedSearch),
  Favorites,
  Local,
}

impl Pool {
  fn choice(&self) -> SourceChoice {
    match self {
      Self::SavedSearch(_) => SourceChoice::SavedSearch,
      Self::Favorites => SourceChoice::Favorites,
      Self::Local => SourceChoice::Local,
    }
  }
}

pub struct RotationEngine<S, R, D> {
  store:         Arc<S>,
  source:        Arc<R>,
  downloader:    Arc<D>,
  collaborators: Collaborators,
  temp:          TempCache,
  downloads_dir: Option<PathBuf>,
  clock:         Arc<dyn Clock>,
}

impl<S, R, D> RotationEngine<S, R, D>
where
  S: WallpaperStore,
  R: SearchSource,
  D: Downloader,
{
  pub fn new(
    store: Arc<S>,
    source: Arc<R>,
    downloader: Arc<D>,
    collaborators: Collaborators,
    temp: TempCache,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      store,
      source,
      downloader,
      collaborators,
      temp,
      downloads_dir: None,
      clock,
    }
  }

  /// Where applied remote wallpapers are copied when the `download`
  /// preference is on.
  pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.downloads_dir = Some(dir.into());
    self
  }

  pub async fn rotate(&self, request: RotationRequest) -> Result<RotationSuccess, RotationError> {
    let prefs = self
      .store
      .get_auto_wallpaper_preferences()
      .await
      .map_err(RotationError::store)?;

    if !prefs.enabled && !request.force {
      return Err(RotationError::Disabled);
    }

    if !prefs.any_source_enabled() {
      return Err(RotationError::NoSourcesEnabled);
    }
    let pools = self.enabled_pools(&prefs).await?;
    let Some(pool) = pick_pool(pools) else {
      return Err(RotationError::NoSourcesEnabled);
    };
    let source_choice = pool.choice();
    info!(%source_choice, "rotating wallpaper");

    let candidate = match pool {
      Pool::SavedSearch(saved) => self.next_from_saved_search(&saved.query).await?,
      Pool::Favorites => self
        .collaborators
        .favorites
        .random_favorite()
        .await
        .unwrap_or_else(|e| {
          warn!(error = %e, "favorites provider failed");
          None
        }),
      Pool::Local => self
        .collaborators
        .local
        .random_local_wallpaper(&prefs.local_dirs)
        .await
        .unwrap_or_else(|e| {
          warn!(error = %e, "local provider failed");
          None
        }),
    };
    let wallpaper = candidate.ok_or(RotationError::NoWallpaperFound)?;
    debug!(source = %wallpaper.source, source_id = %wallpaper.source_id, "picked candidate");

    let path = self.materialize(&wallpaper).await?;
    self.apply(&prefs, &wallpaper, &path).await?;

    self
      .store
      .upsert_history(NewHistoryEntry {
        source_id: wallpaper.source_id.clone(),
        source: wallpaper.source,
        source_choice,
        set_on: self.clock.now(),
      })
      .await
      .map_err(RotationError::store)?;

    self.post_process(&prefs, &wallpaper, &path).await;

    info!(
      source = %wallpaper.source,
      source_id = %wallpaper.source_id,
      path = %path.display(),
      "wallpaper applied"
    );
    Ok(RotationSuccess { wallpaper, source_choice, path })
  }

  async fn enabled_pools(&self, prefs: &AutoWallpaperPreferences) -> Result<Vec<Pool>, RotationError> {
    let mut pools = Vec::new();
    if prefs.saved_search_enabled {
      let Some(id) = prefs.saved_search_id else {
        return Err(RotationError::SourceMisconfigured);
      };
      let saved = self
        .store
        .get_saved_search(id)
        .await
        .map_err(RotationError::store)?
        .ok_or(RotationError::SourceMisconfigured)?;
      pools.push(Pool::SavedSearch(saved));
    }
    if prefs.favorites_enabled {
      pools.push(Pool::Favorites);
    }
    if prefs.local_source_usable() {
      pools.push(Pool::Local);
    }
    Ok(pools)
  }

  // ─── Saved search selection ──────────────────────────────────────────────

  /// The first result not yet in the history ledger, in upstream order. If
  /// every result has been applied before, the one applied longest ago.
  async fn next_from_saved_search(&self, query: &SearchQuery) -> Result<Option<Wallpaper>, RotationError> {
    let history: HashMap<(Source, String), DateTime<Utc>> = self
      .store
      .list_history()
      .await
      .map_err(RotationError::store)?
      .into_iter()
      .map(|h| ((h.source, h.source_id), h.set_on))
      .collect();

    let mut pager = self.pager(query);
    loop {
      match pager.next_batch().await {
        Ok(Some(batch)) => {
          let unseen = batch.into_iter().find(|r| {
            !history.contains_key(&(r.wallpaper.source, r.wallpaper.source_id.clone()))
          });
          if let Some(record) = unseen {
            return Ok(Some(record.wallpaper));
          }
        }
        Ok(None) => break,
        Err(e) => {
          skip_load_error(e)?;
          break;
        }
      }
    }

    debug!("no unseen saved search result, picking the oldest");
    let mut oldest: Option<(Option<DateTime<Utc>>, Wallpaper)> = None;
    let mut pager = self.pager(query);
    loop {
      let batch = match pager.next_batch().await {
        Ok(Some(batch)) => batch,
        Ok(None) => break,
        Err(e) => {
          skip_load_error(e)?;
          break;
        }
      };
      for record in batch {
        let key = (record.wallpaper.source, record.wallpaper.source_id.clone());
        let applied = history.get(&key).copied();
        if oldest.as_ref().is_none_or(|(best, _)| applied < *best) {
          oldest = Some((applied, record.wallpaper));
        }
      }
    }
    Ok(oldest.map(|(_, wallpaper)| wallpaper))
  }

  fn pager(&self, query: &SearchQuery) -> QueryPager<S, R> {
    let mediator = RemoteMediator::new(
      self.store.clone(),
      self.source.clone(),
      self.clock.clone(),
      query,
    );
    QueryPager::new(mediator, DEFAULT_BATCH_SIZE)
  }

  // ─── Materialize and apply ───────────────────────────────────────────────

  async fn materialize(&self, wallpaper: &Wallpaper) -> Result<PathBuf, RotationError> {
    if !wallpaper.source.is_remote() {
      return Ok(local_path(&wallpaper.url));
    }
    download_verified(self.downloader.as_ref(), &self.temp, wallpaper)
      .await
      .map_err(|e| {
        warn!(source_id = %wallpaper.source_id, error = %e, "cannot materialize wallpaper");
        RotationError::NoWallpaperFound
      })
  }

  async fn apply(
    &self,
    prefs: &AutoWallpaperPreferences,
    wallpaper: &Wallpaper,
    path: &Path,
  ) -> Result<(), RotationError> {
    let setter = &self.collaborators.setter;
    let screen = setter.display();

    let detection = match (&self.collaborators.detector, prefs.use_object_detection) {
      (Some(detector), true) => detector.detect(path).await.unwrap_or_else(|e| {
        warn!(error = %e, "object detection failed, centring crop");
        None
      }),
      _ => None,
    };
    let crop = compute_crop(wallpaper.resolution, screen.resolution, detection.as_ref());
    debug!(display = %screen.name, ?crop, "applying wallpaper");

    match setter.set_wallpaper(&screen, path, crop, prefs.targets).await {
      Ok(true) => Ok(()),
      Ok(false) => {
        warn!(display = %screen.name, "platform refused the wallpaper");
        Err(RotationError::NoWallpaperFound)
      }
      Err(e) => {
        warn!(display = %screen.name, error = %e, "cannot set wallpaper");
        Err(RotationError::NoWallpaperFound)
      }
    }
  }

  async fn post_process(&self, prefs: &AutoWallpaperPreferences, wallpaper: &Wallpaper, path: &Path) {
    if prefs.mark_favorite
      && let Err(e) = self.collaborators.favorites.add_favorite(wallpaper).await
    {
      warn!(error = %e, "cannot mark wallpaper as favorite");
    }

    if prefs.download && wallpaper.source.is_remote() {
      match &self.downloads_dir {
        Some(dir) => {
          if let Err(e) = copy_to_downloads(dir, wallpaper, path).await {
            warn!(dir = %dir.display(), error = %e, "cannot copy wallpaper to downloads");
          }
        }
        None => debug!("no downloads directory configured"),
      }
    }

    if prefs.show_notification
      && let Err(e) = self.collaborators.notifier.notify(wallpaper, path).await
    {
      warn!(error = %e, "cannot show notification");
    }
  }
}

/// Transport failures end the saved-search scan quietly; store failures
/// abort the rotation.
fn skip_load_error(e: LoadError) -> Result<(), RotationError> {
  match e {
    LoadError::Store(e) => Err(RotationError::Store(e)),
    e => {
      warn!(error = %e, "saved search paging failed");
      Ok(())
    }
  }
}

fn pick_pool(mut pools: Vec<Pool>) -> Option<Pool> {
  if pools.is_empty() {
    return None;
  }
  let idx = rand::rng().random_range(0..pools.len());
  Some(pools.swap_remove(idx))
}

fn local_path(url: &str) -> PathBuf {
  PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

async fn copy_to_downloads(dir: &Path, wallpaper: &Wallpaper, path: &Path) -> std::io::Result<()> {
  tokio::fs::create_dir_all(dir).await?;
  let name = match url_extension(&wallpaper.url) {
    Some(ext) => format!("{}-{}.{ext}", wallpaper.source, wallpaper.source_id),
    None => format!("{}-{}", wallpaper.source, wallpaper.source_id),
  };
  tokio::fs::copy(path, dir.join(name)).await?;
  Ok(())
}
