//! Error types for `tapet-engine`.

use std::error::Error as StdError;

use tapet_core::source::TransportError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// A failed paginator load. Nothing from the failed page is committed.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("i/o error: {0}")]
  Io(String),

  #[error("http status {status}")]
  Http { status: u16 },

  #[error("protocol error: {0}")]
  Protocol(String),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl LoadError {
  pub(crate) fn store(e: impl StdError + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// The upstream could not be reached or answered badly. The cache itself
  /// is intact.
  pub fn is_transport(&self) -> bool { !matches!(self, Self::Store(_)) }
}

impl From<TransportError> for LoadError {
  fn from(e: TransportError) -> Self {
    match e {
      TransportError::Io(msg) => Self::Io(msg),
      TransportError::Http { status } => Self::Http { status },
      TransportError::Protocol(msg) => Self::Protocol(msg),
    }
  }
}

#[derive(Debug, Error)]
pub enum CleanupError {
  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

#[derive(Debug, Error)]
pub enum DownloadError {
  /// Every attempt failed or produced a file of the wrong size.
  #[error("download failed after {attempts} attempts")]
  Exhausted { attempts: u32 },

  #[error("temp directory error: {0}")]
  TempDir(#[from] std::io::Error),
}

/// Terminal failure of one rotation. Configuration problems are reported
/// distinctly so a caller can tell the user what to fix.
#[derive(Debug, Error)]
pub enum RotationError {
  #[error("auto wallpaper is disabled")]
  Disabled,

  #[error("no wallpaper source is enabled")]
  NoSourcesEnabled,

  #[error("saved search source is enabled but its saved search is missing")]
  SourceMisconfigured,

  #[error("no wallpaper found")]
  NoWallpaperFound,

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl RotationError {
  pub(crate) fn store(e: impl StdError + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}
