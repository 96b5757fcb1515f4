//! In-process stand-ins for the upstream API, the downloader and the
//! platform collaborators.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::SystemTime,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tapet_core::{
  clock::ManualClock,
  crop::{Detection, Rect},
  platform::{
    Display, FavoritesProvider, LocalProvider, Notifier, ObjectDetector, PlatformError,
    WallpaperSetter,
  },
  prefs::Targets,
  query::SearchQuery,
  source::{Downloader, PageMeta, Progress, SearchPage, SearchSource, TransportError},
  wallpaper::{Resolution, Source, Wallpaper},
};

pub const FILE_SIZE: u64 = 64;

pub fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() }

pub fn clock_at(start: DateTime<Utc>) -> Arc<ManualClock> { Arc::new(ManualClock::new(start)) }

pub fn remote_wallpaper(id: &str) -> Wallpaper {
  Wallpaper {
    source:     Source::Wallhaven,
    source_id:  id.into(),
    url:        format!("https://w.example.com/full/{id}.jpg"),
    file_size:  FILE_SIZE,
    resolution: Resolution::new(1920, 1080),
    created_at: t0(),
    metadata:   serde_json::Value::Null,
  }
}

pub fn query(terms: &[&str]) -> SearchQuery {
  SearchQuery::with_includes(terms.iter().copied())
}

/// Set a file's mtime.
pub fn touch(path: &Path, at: DateTime<Utc>) {
  let file = std::fs::File::options().write(true).open(path).unwrap();
  file.set_modified(SystemTime::from(at)).unwrap();
}

// ─── Search source ───────────────────────────────────────────────────────────

/// Serves fixed id lists, paginated `per_page` at a time. Queries without an
/// explicit list get the default one.
pub struct FakeSearchSource {
  default:  Vec<String>,
  by_query: HashMap<String, Vec<String>>,
  per_page: u32,
  calls:    AtomicUsize,
  failure:  Mutex<Option<TransportError>>,
}

impl FakeSearchSource {
  /// `total` results named `w000`, `w001`, ... for every query.
  pub fn uniform(total: usize, per_page: u32) -> Self {
    Self {
      default: (0..total).map(|i| format!("w{i:03}")).collect(),
      by_query: HashMap::new(),
      per_page,
      calls: AtomicUsize::new(0),
      failure: Mutex::new(None),
    }
  }

  pub fn with_query(mut self, q: &SearchQuery, ids: &[&str]) -> Self {
    self
      .by_query
      .insert(q.to_query_string(), ids.iter().map(|s| s.to_string()).collect());
    self
  }

  pub fn fail_with(&self, error: Option<TransportError>) {
    *self.failure.lock().unwrap() = error;
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl SearchSource for FakeSearchSource {
  async fn search(
    &self,
    query: &SearchQuery,
    page: Option<u32>,
  ) -> Result<SearchPage, TransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(e) = self.failure.lock().unwrap().clone() {
      return Err(e);
    }

    let ids = self.by_query.get(&query.to_query_string()).unwrap_or(&self.default);
    let per_page = self.per_page as usize;
    let last_page = ids.len().div_ceil(per_page).max(1) as u32;
    let current_page = page.unwrap_or(1);
    let start = ((current_page - 1) as usize * per_page).min(ids.len());
    let end = (start + per_page).min(ids.len());

    Ok(SearchPage {
      items: ids[start..end].iter().map(|id| remote_wallpaper(id)).collect(),
      meta:  PageMeta {
        current_page,
        last_page,
        per_page: self.per_page,
        total: ids.len() as u64,
      },
    })
  }
}

// ─── Downloader ──────────────────────────────────────────────────────────────

/// Writes `bytes` zero bytes to the destination on every call.
pub struct FakeDownloader {
  bytes: usize,
  calls: AtomicUsize,
}

impl FakeDownloader {
  pub fn writing(bytes: usize) -> Self { Self { bytes, calls: AtomicUsize::new(0) } }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Downloader for FakeDownloader {
  async fn download(
    &self,
    _url: &str,
    dest: &Path,
    progress: Progress<'_>,
  ) -> Result<u64, TransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    tokio::fs::write(dest, vec![0u8; self.bytes])
      .await
      .map_err(|e| TransportError::Io(e.to_string()))?;
    progress(self.bytes as u64, Some(self.bytes as u64));
    Ok(self.bytes as u64)
  }
}

// ─── Platform collaborators ──────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeFavorites {
  pub items: Vec<Wallpaper>,
  pub added: Mutex<Vec<Wallpaper>>,
}

#[async_trait]
impl FavoritesProvider for FakeFavorites {
  async fn random_favorite(&self) -> Result<Option<Wallpaper>, PlatformError> {
    Ok(self.items.first().cloned())
  }

  async fn add_favorite(&self, wallpaper: &Wallpaper) -> Result<(), PlatformError> {
    self.added.lock().unwrap().push(wallpaper.clone());
    Ok(())
  }
}

#[derive(Default)]
pub struct FakeLocal {
  pub wallpaper: Option<Wallpaper>,
}

#[async_trait]
impl LocalProvider for FakeLocal {
  async fn random_local_wallpaper(
    &self,
    _dirs: &[PathBuf],
  ) -> Result<Option<Wallpaper>, PlatformError> {
    Ok(self.wallpaper.clone())
  }
}

pub struct FakeDetector;

#[async_trait]
impl ObjectDetector for FakeDetector {
  async fn detect(&self, _image: &Path) -> Result<Option<Detection>, PlatformError> {
    Err("detector unavailable".into())
  }
}

pub struct FakeSetter {
  pub accept:  AtomicBool,
  pub applied: Mutex<Vec<(PathBuf, Rect, Targets)>>,
}

impl FakeSetter {
  pub fn accepting() -> Self {
    Self { accept: AtomicBool::new(true), applied: Mutex::new(Vec::new()) }
  }

  pub fn applied_count(&self) -> usize { self.applied.lock().unwrap().len() }
}

#[async_trait]
impl WallpaperSetter for FakeSetter {
  fn display(&self) -> Display {
    Display { name: "test".into(), resolution: Resolution::new(1920, 1080) }
  }

  async fn set_wallpaper(
    &self,
    _display: &Display,
    image: &Path,
    crop: Rect,
    targets: Targets,
  ) -> Result<bool, PlatformError> {
    if !self.accept.load(Ordering::SeqCst) {
      return Ok(false);
    }
    self.applied.lock().unwrap().push((image.to_path_buf(), crop, targets));
    Ok(true)
  }
}

/// Counts calls and always fails.
#[derive(Default)]
pub struct FailingNotifier {
  pub calls: AtomicUsize,
}

#[async_trait]
impl Notifier for FailingNotifier {
  async fn notify(&self, _wallpaper: &Wallpaper, _image: &Path) -> Result<(), PlatformError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Err("notifications unavailable".into())
  }
}
