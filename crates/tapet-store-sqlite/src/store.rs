//! [`SqliteStore`], the SQLite implementation of [`WallpaperStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Transaction};

use tapet_core::{
  history::{HistoryEntry, NewHistoryEntry},
  prefs::AutoWallpaperPreferences,
  query::{RemoteKey, SavedSearch, SearchQuery, SearchQueryEntry},
  store::{ExpiredDeletion, PageWrite, PageWriteKind, WallpaperStore},
  wallpaper::{Source, WallpaperRecord},
};

use crate::{
  encode::{
    decode_page, encode_dt, EncodedWallpaper, RawHistoryEntry, RawSavedSearch,
    RawSearchQuery, RawWallpaper, WALLPAPER_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Preference-store key holding the serialised [`AutoWallpaperPreferences`].
const AUTO_WALLPAPER_PREFS_KEY: &str = "auto_wallpaper";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tapet wallpaper cache backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of link rows for a query; exposed for diagnostics and tests.
  pub async fn count_links(&self, query_string: &str) -> Result<u64> {
    let query_string = query_string.to_owned();
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*)
           FROM search_query_wallpapers l
           JOIN search_queries q ON q.id = l.search_query_id
           WHERE q.query_string = ?1",
          rusqlite::params![query_string],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n as u64)
  }
}

// ─── Transaction helpers ─────────────────────────────────────────────────────

/// Insert a wallpaper or update the existing row with the same source and
/// external id in place. Returns the (stable) row id.
fn upsert_wallpaper(
  tx: &Transaction<'_>,
  w: &EncodedWallpaper,
) -> rusqlite::Result<i64> {
  tx.execute(
    "INSERT INTO wallpapers (
       source, source_id, url, file_size, width, height, created_at, metadata_json
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (source, source_id) DO UPDATE SET
       url           = excluded.url,
       file_size     = excluded.file_size,
       width         = excluded.width,
       height        = excluded.height,
       created_at    = excluded.created_at,
       metadata_json = excluded.metadata_json",
    rusqlite::params![
      w.source,
      w.source_id,
      w.url,
      w.file_size,
      w.width,
      w.height,
      w.created_at,
      w.metadata_json,
    ],
  )?;
  tx.query_row(
    "SELECT id FROM wallpapers WHERE source = ?1 AND source_id = ?2",
    rusqlite::params![w.source, w.source_id],
    |r| r.get(0),
  )
}

/// Drop a query's RemoteKey, the wallpapers only it links to, and all of its
/// links. The query row itself is left alone. Returns the deleted
/// wallpapers.
fn clear_query_cache(
  tx: &Transaction<'_>,
  query_id: i64,
) -> rusqlite::Result<Vec<RawWallpaper>> {
  tx.execute(
    "DELETE FROM search_query_remote_keys WHERE search_query_id = ?1",
    rusqlite::params![query_id],
  )?;

  let exclusive = {
    let mut stmt = tx.prepare(&format!(
      "SELECT {WALLPAPER_COLUMNS}
       FROM wallpapers w
       JOIN search_query_wallpapers l ON l.wallpaper_id = w.id
       WHERE l.search_query_id = ?1
         AND (SELECT COUNT(*) FROM search_query_wallpapers o
              WHERE o.wallpaper_id = w.id) = 1"
    ))?;
    stmt
      .query_map(rusqlite::params![query_id], RawWallpaper::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  for w in &exclusive {
    tx.execute(
      "DELETE FROM search_query_wallpapers WHERE wallpaper_id = ?1",
      rusqlite::params![w.id],
    )?;
    tx.execute("DELETE FROM wallpapers WHERE id = ?1", rusqlite::params![w.id])?;
  }

  tx.execute(
    "DELETE FROM search_query_wallpapers WHERE search_query_id = ?1",
    rusqlite::params![query_id],
  )?;

  Ok(exclusive)
}

fn select_query_by_id(
  tx: &Transaction<'_>,
  id: i64,
) -> rusqlite::Result<RawSearchQuery> {
  tx.query_row(
    "SELECT id, query_string, last_updated_on FROM search_queries WHERE id = ?1",
    rusqlite::params![id],
    |row| {
      Ok(RawSearchQuery {
        id:              row.get(0)?,
        query_string:    row.get(1)?,
        last_updated_on: row.get(2)?,
      })
    },
  )
}

// ─── WallpaperStore impl ─────────────────────────────────────────────────────

impl WallpaperStore for SqliteStore {
  type Error = Error;

  // ── Search-query cache index ──────────────────────────────────────────────

  async fn get_search_query(&self, query_string: &str) -> Result<Option<SearchQueryEntry>> {
    let query_string = query_string.to_owned();

    let raw: Option<RawSearchQuery> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, query_string, last_updated_on
             FROM search_queries WHERE query_string = ?1",
            rusqlite::params![query_string],
            |row| {
              Ok(RawSearchQuery {
                id:              row.get(0)?,
                query_string:    row.get(1)?,
                last_updated_on: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSearchQuery::into_entry).transpose()
  }

  async fn get_remote_key(&self, query_string: &str) -> Result<Option<RemoteKey>> {
    let query_string = query_string.to_owned();

    let raw: Option<(i64, Option<i64>)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT k.search_query_id, k.next_page_number
             FROM search_query_remote_keys k
             JOIN search_queries q ON q.id = k.search_query_id
             WHERE q.query_string = ?1",
            rusqlite::params![query_string],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(search_query_id, next)| {
        Ok(RemoteKey { search_query_id, next_page: decode_page(next)? })
      })
      .transpose()
  }

  async fn store_page(&self, page: PageWrite) -> Result<SearchQueryEntry> {
    let encoded = page
      .items
      .iter()
      .map(EncodedWallpaper::encode)
      .collect::<Result<Vec<_>>>()?;
    let query_string = page.query_string;
    let refresh      = page.kind == PageWriteKind::Refresh;
    let now_str      = encode_dt(page.now);
    let next_page    = page.next_page.map(i64::from);

    let raw: RawSearchQuery = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<(i64, String)> = tx
          .query_row(
            "SELECT id, last_updated_on FROM search_queries WHERE query_string = ?1",
            rusqlite::params![query_string],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;

        let query_id = match existing {
          Some((id, last_updated_on)) => {
            // The timestamp only moves forward.
            if refresh && now_str > last_updated_on {
              tx.execute(
                "UPDATE search_queries SET last_updated_on = ?2 WHERE id = ?1",
                rusqlite::params![id, now_str],
              )?;
            }
            id
          }
          None => {
            tx.execute(
              "INSERT INTO search_queries (query_string, last_updated_on) VALUES (?1, ?2)",
              rusqlite::params![query_string, now_str],
            )?;
            tx.last_insert_rowid()
          }
        };

        if refresh {
          clear_query_cache(&tx, query_id)?;
        }

        let mut position: i64 = tx.query_row(
          "SELECT COALESCE(MAX(position) + 1, 0)
           FROM search_query_wallpapers WHERE search_query_id = ?1",
          rusqlite::params![query_id],
          |r| r.get(0),
        )?;

        for w in &encoded {
          let wallpaper_id = upsert_wallpaper(&tx, w)?;
          // Upstream pages can shift between fetches; a wallpaper already
          // linked to this query keeps its first position.
          let linked = tx.execute(
            "INSERT OR IGNORE INTO search_query_wallpapers
               (search_query_id, wallpaper_id, position)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![query_id, wallpaper_id, position],
          )?;
          if linked > 0 {
            position += 1;
          }
        }

        tx.execute(
          "INSERT INTO search_query_remote_keys (search_query_id, next_page_number)
           VALUES (?1, ?2)
           ON CONFLICT (search_query_id) DO UPDATE SET
             next_page_number = excluded.next_page_number",
          rusqlite::params![query_id, next_page],
        )?;

        let raw = select_query_by_id(&tx, query_id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_entry()
  }

  async fn query_wallpapers(
    &self,
    query_string: &str,
    offset: usize,
    limit: usize,
  ) -> Result<Vec<WallpaperRecord>> {
    let query_string = query_string.to_owned();
    let offset_val   = offset as i64;
    let limit_val    = limit as i64;

    let raws: Vec<RawWallpaper> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {WALLPAPER_COLUMNS}
           FROM wallpapers w
           JOIN search_query_wallpapers l ON l.wallpaper_id = w.id
           JOIN search_queries q          ON q.id = l.search_query_id
           WHERE q.query_string = ?1
           ORDER BY l.position
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![query_string, limit_val, offset_val],
            RawWallpaper::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawWallpaper::into_record).collect()
  }

  async fn count_search_queries(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM search_queries", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  // ── Wallpapers ────────────────────────────────────────────────────────────

  async fn get_wallpaper(
    &self,
    source: Source,
    source_id: &str,
  ) -> Result<Option<WallpaperRecord>> {
    let source_str = source.as_str();
    let source_id  = source_id.to_owned();

    let raw: Option<RawWallpaper> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {WALLPAPER_COLUMNS} FROM wallpapers w
               WHERE w.source = ?1 AND w.source_id = ?2"
            ),
            rusqlite::params![source_str, source_id],
            RawWallpaper::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawWallpaper::into_record).transpose()
  }

  async fn count_wallpapers(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM wallpapers", [], |r| r.get(0))?)
      })
      .await?;
    Ok(n as u64)
  }

  // ── Retention ─────────────────────────────────────────────────────────────

  async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<ExpiredDeletion> {
    let cutoff_str = encode_dt(cutoff);

    let (queries_deleted, raws): (u64, Vec<RawWallpaper>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let expired: Vec<i64> = {
          let mut stmt = tx
            .prepare("SELECT id FROM search_queries WHERE last_updated_on < ?1")?;
          stmt
            .query_map(rusqlite::params![cutoff_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        // Queries are handled one at a time, so a wallpaper shared by two
        // expired queries is only exclusive (and deleted) at the second.
        let mut deleted = Vec::new();
        for id in &expired {
          deleted.extend(clear_query_cache(&tx, *id)?);
          tx.execute(
            "DELETE FROM search_queries WHERE id = ?1",
            rusqlite::params![id],
          )?;
        }

        tx.commit()?;
        Ok((expired.len() as u64, deleted))
      })
      .await?;

    Ok(ExpiredDeletion {
      queries_deleted,
      wallpapers: raws
        .into_iter()
        .map(RawWallpaper::into_record)
        .collect::<Result<_>>()?,
    })
  }

  // ── History ledger ────────────────────────────────────────────────────────

  async fn upsert_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
    let source_id  = entry.source_id;
    let source     = entry.source.as_str();
    let choice     = entry.source_choice.as_str();
    let set_on_str = encode_dt(entry.set_on);

    let raw: RawHistoryEntry = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO auto_wallpaper_history (source_id, source, source_choice, set_on)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (source_id, source) DO UPDATE SET
             source_choice = excluded.source_choice,
             set_on        = excluded.set_on",
          rusqlite::params![source_id, source, choice, set_on_str],
        )?;
        Ok(conn.query_row(
          "SELECT id, source_id, source, source_choice, set_on
           FROM auto_wallpaper_history WHERE source_id = ?1 AND source = ?2",
          rusqlite::params![source_id, source],
          RawHistoryEntry::from_row,
        )?)
      })
      .await?;

    raw.into_entry()
  }

  async fn list_history(&self) -> Result<Vec<HistoryEntry>> {
    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, source_id, source, source_choice, set_on
           FROM auto_wallpaper_history
           ORDER BY set_on DESC, id DESC",
        )?;
        let rows = stmt
          .query_map([], RawHistoryEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn clear_history(&self) -> Result<u64> {
    let n = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM auto_wallpaper_history", [])?))
      .await?;
    Ok(n as u64)
  }

  // ── Saved searches ────────────────────────────────────────────────────────

  async fn add_saved_search(&self, name: String, query: SearchQuery) -> Result<SavedSearch> {
    let query_json = serde_json::to_string(&query)?;
    let name_arg   = name.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM saved_searches WHERE name = ?1",
            rusqlite::params![name_arg],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO saved_searches (name, query_json) VALUES (?1, ?2)",
          rusqlite::params![name_arg, query_json],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    match id {
      Some(id) => Ok(SavedSearch { id, name, query }),
      None => Err(Error::DuplicateSavedSearch(name)),
    }
  }

  async fn get_saved_search(&self, id: i64) -> Result<Option<SavedSearch>> {
    let raw: Option<RawSavedSearch> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, name, query_json FROM saved_searches WHERE id = ?1",
            rusqlite::params![id],
            RawSavedSearch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSavedSearch::into_saved_search).transpose()
  }

  async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
    let raws: Vec<RawSavedSearch> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, name, query_json FROM saved_searches ORDER BY id")?;
        let rows = stmt
          .query_map([], RawSavedSearch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSavedSearch::into_saved_search).collect()
  }

  async fn delete_saved_search(&self, id: i64) -> Result<bool> {
    let n = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM saved_searches WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;
    Ok(n > 0)
  }

  // ── Preferences ───────────────────────────────────────────────────────────

  async fn get_auto_wallpaper_preferences(&self) -> Result<AutoWallpaperPreferences> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT value_json FROM preferences WHERE key = ?1",
            rusqlite::params![AUTO_WALLPAPER_PREFS_KEY],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    match raw {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(AutoWallpaperPreferences::default()),
    }
  }

  async fn set_auto_wallpaper_preferences(&self, prefs: AutoWallpaperPreferences) -> Result<()> {
    let json = serde_json::to_string(&prefs)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO preferences (key, value_json) VALUES (?1, ?2)
           ON CONFLICT (key) DO UPDATE SET value_json = excluded.value_json",
          rusqlite::params![AUTO_WALLPAPER_PREFS_KEY, json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
