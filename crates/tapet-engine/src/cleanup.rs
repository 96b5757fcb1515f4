//! Retention pass over the cache.
//!
//! Expired queries and the wallpapers only they referenced are removed in one
//! store transaction. Temp files are cleaned afterwards: the files of every
//! deleted wallpaper by name, then anything in the temp dir older than the
//! retention window. File failures never fail the job.

use std::sync::Arc;

use tapet_core::{clock::Clock, policy::RETENTION_WINDOW, store::WallpaperStore};
use tracing::{info, warn};

use crate::{error::CleanupError, tempfiles::TempCache};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
  pub queries_deleted:    u64,
  pub wallpapers_deleted: u64,
  pub files_deleted:      u64,
}

pub struct CleanupJob<S> {
  store: Arc<S>,
  temp:  TempCache,
  clock: Arc<dyn Clock>,
}

impl<S: WallpaperStore> CleanupJob<S> {
  pub fn new(store: Arc<S>, temp: TempCache, clock: Arc<dyn Clock>) -> Self {
    Self { store, temp, clock }
  }

  pub async fn run(&self) -> Result<CleanupReport, CleanupError> {
    let cutoff = self.clock.now() - RETENTION_WINDOW;

    let deleted = self
      .store
      .delete_expired(cutoff)
      .await
      .map_err(|e| CleanupError::Store(Box::new(e)))?;

    let mut report = CleanupReport {
      queries_deleted: deleted.queries_deleted,
      wallpapers_deleted: deleted.wallpapers.len() as u64,
      files_deleted: 0,
    };

    for record in &deleted.wallpapers {
      match self.temp.remove(&record.wallpaper.url).await {
        Ok(true) => report.files_deleted += 1,
        Ok(false) => {}
        Err(e) => warn!(
          source_id = %record.wallpaper.source_id,
          error = %e,
          "cannot remove temp file of deleted wallpaper"
        ),
      }
    }

    match self.temp.remove_older_than(cutoff).await {
      Ok(n) => report.files_deleted += n,
      Err(e) => warn!(dir = %self.temp.dir().display(), error = %e, "temp dir sweep failed"),
    }

    info!(
      queries = report.queries_deleted,
      wallpapers = report.wallpapers_deleted,
      files = report.files_deleted,
      %cutoff,
      "cleanup finished"
    );
    Ok(report)
  }
}
