//! Wallpaper types: the unit the cache, the history ledger and the rotation
//! engine all talk about.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where a wallpaper comes from. Together with the external id this forms the
/// identity of a wallpaper.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  /// The Wallhaven search API.
  Wallhaven,
  /// A file in one of the user's local folders.
  Local,
}

impl Source {
  /// The discriminant string stored in `source` columns.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Wallhaven => "wallhaven",
      Self::Local => "local",
    }
  }

  /// Remote wallpapers must be downloaded before they can be applied.
  pub fn is_remote(&self) -> bool { !matches!(self, Self::Local) }
}

impl FromStr for Source {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "wallhaven" => Ok(Self::Wallhaven),
      "local" => Ok(Self::Local),
      other => Err(Error::UnknownSource(other.to_owned())),
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Pixel dimensions of an image or a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
  pub width:  u32,
  pub height: u32,
}

impl Resolution {
  pub fn new(width: u32, height: u32) -> Self { Self { width, height } }

  /// Width divided by height; zero for a degenerate resolution.
  pub fn aspect_ratio(&self) -> f64 {
    if self.height == 0 {
      0.0
    } else {
      f64::from(self.width) / f64::from(self.height)
    }
  }
}

impl fmt::Display for Resolution {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}", self.width, self.height)
  }
}

impl FromStr for Resolution {
  type Err = Error;

  /// Parses the `WIDTHxHEIGHT` form used by upstream APIs.
  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidResolution(s.to_owned());
    let (w, h) = s.split_once('x').ok_or_else(invalid)?;
    Ok(Self {
      width:  w.trim().parse().map_err(|_| invalid())?,
      height: h.trim().parse().map_err(|_| invalid())?,
    })
  }
}

// ─── Wallpaper ───────────────────────────────────────────────────────────────

/// A wallpaper as observed from a source, before (or independent of) being
/// cached in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallpaper {
  pub source:     Source,
  /// External id, unique within `source`.
  pub source_id:  String,
  /// Full-size image URL for remote sources, filesystem path for local ones.
  pub url:        String,
  /// Size in bytes as declared by the source; used to verify downloads.
  pub file_size:  u64,
  pub resolution: Resolution,
  pub created_at: DateTime<Utc>,
  /// Source-specific extras (tags, colours, purity...). Opaque to the core.
  #[serde(default)]
  pub metadata:   serde_json::Value,
}

impl Wallpaper {
  /// Identity key used by the history ledger and favorites.
  pub fn key(&self) -> (&str, Source) { (&self.source_id, self.source) }
}

/// A wallpaper row in the store. `id` is owned by the store and never
/// changes for the lifetime of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallpaperRecord {
  pub id:        i64,
  #[serde(flatten)]
  pub wallpaper: Wallpaper,
}
