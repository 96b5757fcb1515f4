//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that SQL
//! string comparison orders them chronologically. Enums are stored as their
//! discriminant strings; metadata, queries and preferences as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use tapet_core::{
  history::HistoryEntry,
  query::{SavedSearch, SearchQueryEntry},
  wallpaper::{Resolution, Wallpaper, WallpaperRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Integers ────────────────────────────────────────────────────────────────

pub fn encode_u64(v: u64) -> i64 { i64::try_from(v).unwrap_or(i64::MAX) }

fn decode_u64(column: &'static str, v: i64) -> Result<u64> {
  u64::try_from(v).map_err(|_| Error::OutOfRange { column, value: v })
}

fn decode_u32(column: &'static str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::OutOfRange { column, value: v })
}

pub fn decode_page(v: Option<i64>) -> Result<Option<u32>> {
  v.map(|p| decode_u32("next_page_number", p)).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawWallpaper::from_row`], prefixed for joins.
pub const WALLPAPER_COLUMNS: &str = "w.id, w.source, w.source_id, w.url, \
  w.file_size, w.width, w.height, w.created_at, w.metadata_json";

/// Raw values read directly from a `wallpapers` row.
pub struct RawWallpaper {
  pub id:            i64,
  pub source:        String,
  pub source_id:     String,
  pub url:           String,
  pub file_size:     i64,
  pub width:         i64,
  pub height:        i64,
  pub created_at:    String,
  pub metadata_json: String,
}

impl RawWallpaper {
  /// Read the columns in [`WALLPAPER_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      source:        row.get(1)?,
      source_id:     row.get(2)?,
      url:           row.get(3)?,
      file_size:     row.get(4)?,
      width:         row.get(5)?,
      height:        row.get(6)?,
      created_at:    row.get(7)?,
      metadata_json: row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<WallpaperRecord> {
    Ok(WallpaperRecord {
      id:        self.id,
      wallpaper: Wallpaper {
        source:     self.source.parse()?,
        source_id:  self.source_id,
        url:        self.url,
        file_size:  decode_u64("file_size", self.file_size)?,
        resolution: Resolution {
          width:  decode_u32("width", self.width)?,
          height: decode_u32("height", self.height)?,
        },
        created_at: decode_dt(&self.created_at)?,
        metadata:   serde_json::from_str(&self.metadata_json)?,
      },
    })
  }
}

/// A wallpaper flattened into owned column values, ready to move into a
/// `conn.call` closure.
pub struct EncodedWallpaper {
  pub source:        &'static str,
  pub source_id:     String,
  pub url:           String,
  pub file_size:     i64,
  pub width:         i64,
  pub height:        i64,
  pub created_at:    String,
  pub metadata_json: String,
}

impl EncodedWallpaper {
  pub fn encode(w: &Wallpaper) -> Result<Self> {
    Ok(Self {
      source:        w.source.as_str(),
      source_id:     w.source_id.clone(),
      url:           w.url.clone(),
      file_size:     encode_u64(w.file_size),
      width:         i64::from(w.resolution.width),
      height:        i64::from(w.resolution.height),
      created_at:    encode_dt(w.created_at),
      metadata_json: serde_json::to_string(&w.metadata)?,
    })
  }
}

/// Raw values read directly from a `search_queries` row.
pub struct RawSearchQuery {
  pub id:              i64,
  pub query_string:    String,
  pub last_updated_on: String,
}

impl RawSearchQuery {
  pub fn into_entry(self) -> Result<SearchQueryEntry> {
    Ok(SearchQueryEntry {
      id:              self.id,
      query_string:    self.query_string,
      last_updated_on: decode_dt(&self.last_updated_on)?,
    })
  }
}

/// Raw values read directly from an `auto_wallpaper_history` row.
pub struct RawHistoryEntry {
  pub id:            i64,
  pub source_id:     String,
  pub source:        String,
  pub source_choice: String,
  pub set_on:        String,
}

impl RawHistoryEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      source_id:     row.get(1)?,
      source:        row.get(2)?,
      source_choice: row.get(3)?,
      set_on:        row.get(4)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      id:            self.id,
      source_id:     self.source_id,
      source:        self.source.parse()?,
      source_choice: self.source_choice.parse()?,
      set_on:        decode_dt(&self.set_on)?,
    })
  }
}

/// Raw values read directly from a `saved_searches` row.
pub struct RawSavedSearch {
  pub id:         i64,
  pub name:       String,
  pub query_json: String,
}

impl RawSavedSearch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      query_json: row.get(2)?,
    })
  }

  pub fn into_saved_search(self) -> Result<SavedSearch> {
    Ok(SavedSearch {
      id:    self.id,
      name:  self.name,
      query: serde_json::from_str(&self.query_json)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let whole = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap();
    let fractional = whole + chrono::TimeDelta::milliseconds(123);
    let later = whole + chrono::TimeDelta::seconds(1);

    let (a, b, c) = (encode_dt(whole), encode_dt(fractional), encode_dt(later));
    assert!(a < b && b < c);
    assert_eq!(decode_dt(&b).unwrap(), fractional);
  }

  #[test]
  fn negative_size_is_rejected() {
    assert!(matches!(
      decode_u64("file_size", -1),
      Err(Error::OutOfRange { column: "file_size", value: -1 })
    ));
  }
}
