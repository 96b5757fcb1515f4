//! The `WallpaperStore` trait and supporting write types.
//!
//! The trait is implemented by storage backends (e.g. `tapet-store-sqlite`).
//! The background jobs in `tapet-engine` depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  history::{HistoryEntry, NewHistoryEntry},
  prefs::AutoWallpaperPreferences,
  query::{RemoteKey, SavedSearch, SearchQuery, SearchQueryEntry},
  wallpaper::{Source, Wallpaper, WallpaperRecord},
};

// ─── Write types ─────────────────────────────────────────────────────────────

/// How a fetched page relates to what is already cached for its query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWriteKind {
  /// First page of a fresh result set: drop the query's RemoteKey, its
  /// exclusively-owned wallpapers and its links before storing, and bump the
  /// refresh timestamp.
  Refresh,
  /// A following page: link after the existing results.
  Append,
}

/// Everything persisted for one fetched page. Applied atomically by
/// [`WallpaperStore::store_page`].
#[derive(Debug, Clone)]
pub struct PageWrite {
  pub query_string: String,
  pub kind:         PageWriteKind,
  pub items:        Vec<Wallpaper>,
  pub next_page:    Option<u32>,
  pub now:          DateTime<Utc>,
}

/// What a retention pass removed.
#[derive(Debug, Clone, Default)]
pub struct ExpiredDeletion {
  pub queries_deleted: u64,
  /// Wallpaper rows removed because no live query referenced them any more.
  pub wallpapers:      Vec<WallpaperRecord>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational cache, history ledger and preference
/// store.
///
/// Every method that touches more than one table runs in a single
/// transaction: either all of its writes become visible or none do.
pub trait WallpaperStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Search-query cache index ──────────────────────────────────────────

  /// Look up the cache entry for a canonical query string.
  fn get_search_query<'a>(
    &'a self,
    query_string: &'a str,
  ) -> impl Future<Output = Result<Option<SearchQueryEntry>, Self::Error>> + Send + 'a;

  /// The pagination cursor for a query, if one has been written.
  fn get_remote_key<'a>(
    &'a self,
    query_string: &'a str,
  ) -> impl Future<Output = Result<Option<RemoteKey>, Self::Error>> + Send + 'a;

  /// Persist one fetched page: wallpaper upserts (matched on source and
  /// external id), link rows, the RemoteKey and, on refresh, the timestamp.
  /// Creates the cache entry if absent.
  fn store_page(
    &self,
    page: PageWrite,
  ) -> impl Future<Output = Result<SearchQueryEntry, Self::Error>> + Send + '_;

  /// Cached results of a query in upstream order.
  fn query_wallpapers<'a>(
    &'a self,
    query_string: &'a str,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<WallpaperRecord>, Self::Error>> + Send + 'a;

  fn count_search_queries(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Wallpapers ────────────────────────────────────────────────────────

  fn get_wallpaper<'a>(
    &'a self,
    source: Source,
    source_id: &'a str,
  ) -> impl Future<Output = Result<Option<WallpaperRecord>, Self::Error>> + Send + 'a;

  fn count_wallpapers(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Retention ─────────────────────────────────────────────────────────

  /// Delete every query last refreshed before `cutoff`, together with its
  /// RemoteKey, its links and the wallpapers no other query links to.
  /// Wallpapers shared with a live query are kept.
  fn delete_expired(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<ExpiredDeletion, Self::Error>> + Send + '_;

  // ── History ledger ────────────────────────────────────────────────────

  /// Insert, or update `set_on`/`source_choice` of the existing entry for the
  /// same `(source_id, source)`.
  fn upsert_history(
    &self,
    entry: NewHistoryEntry,
  ) -> impl Future<Output = Result<HistoryEntry, Self::Error>> + Send + '_;

  /// All history entries, most recently applied first.
  fn list_history(
    &self,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;

  /// Remove every history entry. Returns how many were removed.
  fn clear_history(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Saved searches ────────────────────────────────────────────────────

  fn add_saved_search(
    &self,
    name: String,
    query: SearchQuery,
  ) -> impl Future<Output = Result<SavedSearch, Self::Error>> + Send + '_;

  fn get_saved_search(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<SavedSearch>, Self::Error>> + Send + '_;

  fn list_saved_searches(
    &self,
  ) -> impl Future<Output = Result<Vec<SavedSearch>, Self::Error>> + Send + '_;

  /// Returns `false` if no saved search had that id.
  fn delete_saved_search(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Preferences ───────────────────────────────────────────────────────

  /// Stored preferences, or the defaults if none were ever written.
  fn get_auto_wallpaper_preferences(
    &self,
  ) -> impl Future<Output = Result<AutoWallpaperPreferences, Self::Error>> + Send + '_;

  fn set_auto_wallpaper_preferences(
    &self,
    prefs: AutoWallpaperPreferences,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
