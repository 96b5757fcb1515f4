//! A forward-only reader over a query's cached results that asks the
//! mediator for more pages whenever the cache runs dry.
//!
//! A failed refresh of a stale query falls back to the rows already cached,
//! so an offline host keeps rotating through what it has.

use tapet_core::{source::SearchSource, store::WallpaperStore, wallpaper::WallpaperRecord};
use tracing::warn;

use crate::{
  error::LoadError,
  mediator::{InitializeAction, LoadType, PagingState, RemoteMediator},
};

pub const DEFAULT_BATCH_SIZE: usize = 24;

pub struct QueryPager<S, R> {
  mediator:    RemoteMediator<S, R>,
  batch_size:  usize,
  offset:      usize,
  initialized: bool,
  end_reached: bool,
  exhausted:   bool,
}

impl<S: WallpaperStore, R: SearchSource> QueryPager<S, R> {
  pub fn new(mediator: RemoteMediator<S, R>, batch_size: usize) -> Self {
    Self {
      mediator,
      batch_size: batch_size.max(1),
      offset: 0,
      initialized: false,
      end_reached: false,
      exhausted: false,
    }
  }

  /// `false` once the cache and the upstream are both exhausted.
  pub fn has_more(&self) -> bool { !self.exhausted }

  /// The next batch of cached results in upstream order, fetching further
  /// pages as needed. `None` once there is nothing left.
  pub async fn next_batch(&mut self) -> Result<Option<Vec<WallpaperRecord>>, LoadError> {
    if self.exhausted {
      return Ok(None);
    }

    if !self.initialized {
      if self.mediator.initialize().await? == InitializeAction::LaunchInitialRefresh {
        self.refresh().await?;
      }
      self.initialized = true;
    }

    loop {
      let batch = self
        .mediator
        .store()
        .query_wallpapers(self.mediator.query_string(), self.offset, self.batch_size)
        .await
        .map_err(LoadError::store)?;

      if !batch.is_empty() {
        self.offset += batch.len();
        return Ok(Some(batch));
      }
      if self.end_reached {
        self.exhausted = true;
        return Ok(None);
      }

      let outcome = self.mediator.load(LoadType::Append, &self.state()).await?;
      self.end_reached = outcome.end_of_pagination_reached;
    }
  }

  async fn refresh(&mut self) -> Result<(), LoadError> {
    match self.mediator.load(LoadType::Refresh, &self.state()).await {
      Ok(outcome) => {
        self.end_reached = outcome.end_of_pagination_reached;
        Ok(())
      }
      Err(e) if e.is_transport() => {
        let cached = self
          .mediator
          .store()
          .get_search_query(self.mediator.query_string())
          .await
          .map_err(LoadError::store)?;
        if cached.is_none() {
          return Err(e);
        }
        warn!(query = %self.mediator.query_string(), error = %e, "refresh failed, serving stale cache");
        self.end_reached = false;
        Ok(())
      }
      Err(e) => Err(e),
    }
  }

  fn state(&self) -> PagingState { PagingState { loaded_items: self.offset } }
}
