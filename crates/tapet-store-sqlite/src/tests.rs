//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tapet_core::{
  history::{NewHistoryEntry, SourceChoice},
  platform::FavoritesProvider,
  prefs::AutoWallpaperPreferences,
  query::SearchQuery,
  store::{PageWrite, PageWriteKind, WallpaperStore},
  wallpaper::{Resolution, Source, Wallpaper},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() }

fn wallpaper(id: &str) -> Wallpaper {
  Wallpaper {
    source:     Source::Wallhaven,
    source_id:  id.into(),
    url:        format!("https://w.example.com/full/{id}.jpg"),
    file_size:  1024,
    resolution: Resolution::new(1920, 1080),
    created_at: t0(),
    metadata:   serde_json::json!({ "purity": "sfw" }),
  }
}

fn page(
  query: &str,
  kind: PageWriteKind,
  ids: &[&str],
  next_page: Option<u32>,
  now: DateTime<Utc>,
) -> PageWrite {
  PageWrite {
    query_string: query.into(),
    kind,
    items: ids.iter().map(|id| wallpaper(id)).collect(),
    next_page,
    now,
  }
}

// ─── Pages ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn store_page_creates_query_and_remote_key() {
  let s = store().await;

  let entry = s
    .store_page(page("q=cats", PageWriteKind::Refresh, &["a", "b"], Some(2), t0()))
    .await
    .unwrap();
  assert_eq!(entry.query_string, "q=cats");
  assert_eq!(entry.last_updated_on, t0());

  let key = s.get_remote_key("q=cats").await.unwrap().unwrap();
  assert_eq!(key.search_query_id, entry.id);
  assert_eq!(key.next_page, Some(2));

  assert_eq!(s.count_wallpapers().await.unwrap(), 2);
  assert_eq!(s.count_search_queries().await.unwrap(), 1);
}

#[tokio::test]
async fn shared_wallpaper_is_stored_once() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a", "shared"], None, t0()))
    .await
    .unwrap();
  s.store_page(page("q=dogs", PageWriteKind::Refresh, &["shared", "b"], None, t0()))
    .await
    .unwrap();

  assert_eq!(s.count_wallpapers().await.unwrap(), 3);
  assert_eq!(s.count_links("q=cats").await.unwrap(), 2);
  assert_eq!(s.count_links("q=dogs").await.unwrap(), 2);
}

#[tokio::test]
async fn refetch_updates_in_place_and_keeps_id() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, t0()))
    .await
    .unwrap();
  let before = s.get_wallpaper(Source::Wallhaven, "a").await.unwrap().unwrap();

  let mut changed = page("q=dogs", PageWriteKind::Refresh, &[], None, t0());
  let mut w = wallpaper("a");
  w.file_size = 4096;
  changed.items.push(w);
  s.store_page(changed).await.unwrap();

  let after = s.get_wallpaper(Source::Wallhaven, "a").await.unwrap().unwrap();
  assert_eq!(after.id, before.id);
  assert_eq!(after.wallpaper.file_size, 4096);
  assert_eq!(after.wallpaper.metadata, serde_json::json!({ "purity": "sfw" }));
}

#[tokio::test]
async fn append_links_after_existing_results() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a", "b"], Some(2), t0()))
    .await
    .unwrap();
  s.store_page(page("q=cats", PageWriteKind::Append, &["c", "a", "d"], None, t0()))
    .await
    .unwrap();

  let ids: Vec<String> = s
    .query_wallpapers("q=cats", 0, 10)
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.wallpaper.source_id)
    .collect();
  assert_eq!(ids, ["a", "b", "c", "d"]);

  let tail = s.query_wallpapers("q=cats", 3, 10).await.unwrap();
  assert_eq!(tail.len(), 1);
  assert_eq!(tail[0].wallpaper.source_id, "d");

  assert_eq!(s.get_remote_key("q=cats").await.unwrap().unwrap().next_page, None);
}

#[tokio::test]
async fn refresh_drops_exclusive_wallpapers_only() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a", "shared"], Some(2), t0()))
    .await
    .unwrap();
  s.store_page(page("q=dogs", PageWriteKind::Refresh, &["shared"], None, t0()))
    .await
    .unwrap();

  let later = t0() + TimeDelta::hours(4);
  let entry = s
    .store_page(page("q=cats", PageWriteKind::Refresh, &["z"], None, later))
    .await
    .unwrap();
  assert_eq!(entry.last_updated_on, later);

  assert!(s.get_wallpaper(Source::Wallhaven, "a").await.unwrap().is_none());
  assert!(s.get_wallpaper(Source::Wallhaven, "shared").await.unwrap().is_some());
  assert_eq!(s.count_links("q=cats").await.unwrap(), 1);
  assert_eq!(s.count_links("q=dogs").await.unwrap(), 1);
}

#[tokio::test]
async fn refresh_timestamp_never_moves_backwards() {
  let s = store().await;
  let later = t0() + TimeDelta::hours(1);

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, later))
    .await
    .unwrap();
  let entry = s
    .store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, t0()))
    .await
    .unwrap();
  assert_eq!(entry.last_updated_on, later);
}

// ─── Retention ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_expired_keeps_wallpapers_shared_with_live_query() {
  let s = store().await;
  let old = t0();
  let fresh = t0() + TimeDelta::days(5);

  s.store_page(page("q=old", PageWriteKind::Refresh, &["a", "w"], Some(2), old))
    .await
    .unwrap();
  s.store_page(page("q=new", PageWriteKind::Refresh, &["w", "b"], None, fresh))
    .await
    .unwrap();

  let deleted = s.delete_expired(t0() + TimeDelta::days(1)).await.unwrap();
  assert_eq!(deleted.queries_deleted, 1);
  let gone: Vec<_> =
    deleted.wallpapers.iter().map(|r| r.wallpaper.source_id.as_str()).collect();
  assert_eq!(gone, ["a"]);

  assert!(s.get_search_query("q=old").await.unwrap().is_none());
  assert!(s.get_remote_key("q=old").await.unwrap().is_none());
  assert!(s.get_search_query("q=new").await.unwrap().is_some());
  assert!(s.get_wallpaper(Source::Wallhaven, "w").await.unwrap().is_some());
  assert_eq!(s.count_wallpapers().await.unwrap(), 2);
}

#[tokio::test]
async fn wallpaper_shared_by_two_expired_queries_is_deleted() {
  let s = store().await;

  s.store_page(page("q=one", PageWriteKind::Refresh, &["w"], None, t0()))
    .await
    .unwrap();
  s.store_page(page("q=two", PageWriteKind::Refresh, &["w"], None, t0()))
    .await
    .unwrap();

  let deleted = s.delete_expired(t0() + TimeDelta::days(8)).await.unwrap();
  assert_eq!(deleted.queries_deleted, 2);
  assert_eq!(deleted.wallpapers.len(), 1);
  assert_eq!(s.count_wallpapers().await.unwrap(), 0);
  assert_eq!(s.count_search_queries().await.unwrap(), 0);
}

#[tokio::test]
async fn delete_expired_with_nothing_old_is_a_no_op() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, t0()))
    .await
    .unwrap();
  let deleted = s.delete_expired(t0()).await.unwrap();
  assert_eq!(deleted.queries_deleted, 0);
  assert!(deleted.wallpapers.is_empty());
  assert_eq!(s.count_wallpapers().await.unwrap(), 1);
}

// ─── History ─────────────────────────────────────────────────────────────────

fn history(id: &str, at: DateTime<Utc>) -> NewHistoryEntry {
  NewHistoryEntry {
    source_id:     id.into(),
    source:        Source::Wallhaven,
    source_choice: SourceChoice::SavedSearch,
    set_on:        at,
  }
}

#[tokio::test]
async fn history_upsert_updates_existing_entry() {
  let s = store().await;

  let first = s.upsert_history(history("a", t0())).await.unwrap();
  let mut again = history("a", t0() + TimeDelta::hours(1));
  again.source_choice = SourceChoice::Favorites;
  let second = s.upsert_history(again).await.unwrap();

  assert_eq!(second.id, first.id);
  assert_eq!(second.set_on, t0() + TimeDelta::hours(1));
  assert_eq!(second.source_choice, SourceChoice::Favorites);
  assert_eq!(s.list_history().await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_lists_most_recent_first_and_clears() {
  let s = store().await;

  s.upsert_history(history("a", t0())).await.unwrap();
  s.upsert_history(history("b", t0() + TimeDelta::hours(2))).await.unwrap();

  let ids: Vec<String> =
    s.list_history().await.unwrap().into_iter().map(|h| h.source_id).collect();
  assert_eq!(ids, ["b", "a"]);

  assert_eq!(s.clear_history().await.unwrap(), 2);
  assert!(s.list_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_survives_wallpaper_eviction() {
  let s = store().await;

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, t0()))
    .await
    .unwrap();
  s.upsert_history(history("a", t0())).await.unwrap();
  s.delete_expired(t0() + TimeDelta::days(8)).await.unwrap();

  assert_eq!(s.count_wallpapers().await.unwrap(), 0);
  assert_eq!(s.list_history().await.unwrap().len(), 1);
}

// ─── Saved searches ──────────────────────────────────────────────────────────

#[tokio::test]
async fn saved_search_roundtrip_and_delete() {
  let s = store().await;

  let saved = s
    .add_saved_search("cats".into(), SearchQuery::with_includes(["cat"]))
    .await
    .unwrap();
  let fetched = s.get_saved_search(saved.id).await.unwrap().unwrap();
  assert_eq!(fetched, saved);
  assert_eq!(s.list_saved_searches().await.unwrap().len(), 1);

  assert!(s.delete_saved_search(saved.id).await.unwrap());
  assert!(!s.delete_saved_search(saved.id).await.unwrap());
  assert!(s.get_saved_search(saved.id).await.unwrap().is_none());
}

#[tokio::test]
async fn saved_search_names_are_unique() {
  let s = store().await;

  s.add_saved_search("cats".into(), SearchQuery::default()).await.unwrap();
  let err = s
    .add_saved_search("cats".into(), SearchQuery::default())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateSavedSearch(ref n) if n == "cats"));
}

// ─── Preferences ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn preferences_default_then_roundtrip() {
  let s = store().await;

  let prefs = s.get_auto_wallpaper_preferences().await.unwrap();
  assert_eq!(prefs, AutoWallpaperPreferences::default());

  let updated = AutoWallpaperPreferences {
    enabled: true,
    saved_search_enabled: true,
    saved_search_id: Some(7),
    ..Default::default()
  };
  s.set_auto_wallpaper_preferences(updated.clone()).await.unwrap();
  assert_eq!(s.get_auto_wallpaper_preferences().await.unwrap(), updated);
}

// ─── Favorites ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn favorites_are_idempotent_and_survive_eviction() {
  let s = store().await;

  assert!(s.random_favorite().await.unwrap().is_none());

  s.store_page(page("q=cats", PageWriteKind::Refresh, &["a"], None, t0()))
    .await
    .unwrap();
  s.add_favorite(&wallpaper("a")).await.unwrap();
  s.add_favorite(&wallpaper("a")).await.unwrap();
  s.delete_expired(t0() + TimeDelta::days(8)).await.unwrap();

  assert_eq!(s.list_favorites().await.unwrap().len(), 1);
  let favorite = s.random_favorite().await.unwrap().unwrap();
  assert_eq!(favorite, wallpaper("a"));
}
