//! Error type for `tapet-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tapet_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A numeric column held a value outside the domain type's range.
  #[error("column {column} out of range: {value}")]
  OutOfRange { column: &'static str, value: i64 },

  #[error("saved search name already taken: {0:?}")]
  DuplicateSavedSearch(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
