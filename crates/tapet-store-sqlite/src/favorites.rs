//! Favorites backed by the `favorites` table.
//!
//! Favorites are stored as full snapshots so they survive cache eviction.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tapet_core::{
  platform::{FavoritesProvider, PlatformError},
  wallpaper::Wallpaper,
};

use crate::{encode::encode_dt, Result, SqliteStore};

impl SqliteStore {
  /// Every favorite, most recently added first.
  pub async fn list_favorites(&self) -> Result<Vec<Wallpaper>> {
    let raws: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT wallpaper_json FROM favorites ORDER BY favorited_on DESC",
        )?;
        let rows = stmt
          .query_map([], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      raws
        .iter()
        .map(|json| serde_json::from_str(json))
        .collect::<serde_json::Result<_>>()?,
    )
  }
}

#[async_trait]
impl FavoritesProvider for SqliteStore {
  async fn random_favorite(&self) -> Result<Option<Wallpaper>, PlatformError> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT wallpaper_json FROM favorites ORDER BY RANDOM() LIMIT 1",
            [],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(|json| serde_json::from_str(&json)).transpose()?)
  }

  async fn add_favorite(&self, wallpaper: &Wallpaper) -> Result<(), PlatformError> {
    let source_id = wallpaper.source_id.clone();
    let source    = wallpaper.source.as_str();
    let json      = serde_json::to_string(wallpaper)?;
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO favorites (source_id, source, wallpaper_json, favorited_on)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (source_id, source) DO NOTHING",
          rusqlite::params![source_id, source, json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
