//! Error types for `tapet-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown source discriminant: {0:?}")]
  UnknownSource(String),

  #[error("unknown source choice discriminant: {0:?}")]
  UnknownSourceChoice(String),

  #[error("invalid resolution: {0:?}")]
  InvalidResolution(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
