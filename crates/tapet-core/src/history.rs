//! The auto-wallpaper history ledger.
//!
//! History rows reference wallpapers by `(source_id, source)` rather than by
//! row id, so evicting a wallpaper from the cache never erases the fact that
//! it was shown.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, wallpaper::Source};

/// The candidate pool a rotation drew its wallpaper from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChoice {
  SavedSearch,
  Favorites,
  Local,
}

impl SourceChoice {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::SavedSearch => "saved_search",
      Self::Favorites => "favorites",
      Self::Local => "local",
    }
  }
}

impl FromStr for SourceChoice {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "saved_search" => Ok(Self::SavedSearch),
      "favorites" => Ok(Self::Favorites),
      "local" => Ok(Self::Local),
      other => Err(Error::UnknownSourceChoice(other.to_owned())),
    }
  }
}

impl fmt::Display for SourceChoice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One applied wallpaper. At most one entry exists per `(source_id, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id:            i64,
  pub source_id:     String,
  pub source:        Source,
  pub source_choice: SourceChoice,
  pub set_on:        DateTime<Utc>,
}

/// Input to [`crate::store::WallpaperStore::upsert_history`].
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub source_id:     String,
  pub source:        Source,
  pub source_choice: SourceChoice,
  pub set_on:        DateTime<Utc>,
}
