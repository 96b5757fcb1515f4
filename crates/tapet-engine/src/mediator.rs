//! Remote mediator for one search query.
//!
//! Sits between a paginated upstream API and the local cache: decides whether
//! a cached query is fresh enough to serve as-is, and fetches pages into the
//! store on refresh or append. Each fetched page is committed atomically.

use std::sync::Arc;

use tapet_core::{
  clock::Clock,
  policy::FRESHNESS_WINDOW,
  query::SearchQuery,
  source::SearchSource,
  store::{PageWrite, PageWriteKind, WallpaperStore},
};
use tracing::{debug, warn};

use crate::error::LoadError;

/// What to do before the first read of a query's cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
  LaunchInitialRefresh,
  SkipInitialRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
  /// Fetch page 1 and replace the query's cached results.
  Refresh,
  /// Upstream results are never prepended.
  Prepend,
  /// Fetch the page the stored cursor points at.
  Append,
}

/// What the caller has loaded so far. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingState {
  pub loaded_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
  pub end_of_pagination_reached: bool,
}

impl LoadOutcome {
  fn end() -> Self { Self { end_of_pagination_reached: true } }
}

pub struct RemoteMediator<S, R> {
  store:        Arc<S>,
  source:       Arc<R>,
  clock:        Arc<dyn Clock>,
  query:        SearchQuery,
  query_string: String,
}

impl<S: WallpaperStore, R: SearchSource> RemoteMediator<S, R> {
  /// The query is normalized here; every cache lookup uses its canonical
  /// string.
  pub fn new(store: Arc<S>, source: Arc<R>, clock: Arc<dyn Clock>, query: &SearchQuery) -> Self {
    let query = query.normalized();
    let query_string = query.to_query_string();
    Self { store, source, clock, query, query_string }
  }

  pub fn query_string(&self) -> &str { &self.query_string }

  pub(crate) fn store(&self) -> &S { &self.store }

  /// Skip the refresh when the cached query was updated within the freshness
  /// window.
  pub async fn initialize(&self) -> Result<InitializeAction, LoadError> {
    let entry = self
      .store
      .get_search_query(&self.query_string)
      .await
      .map_err(LoadError::store)?;

    let action = match entry {
      Some(entry) if self.clock.now() - entry.last_updated_on <= FRESHNESS_WINDOW => {
        InitializeAction::SkipInitialRefresh
      }
      _ => InitializeAction::LaunchInitialRefresh,
    };
    debug!(query = %self.query_string, ?action, "initialized mediator");
    Ok(action)
  }

  pub async fn load(
    &self,
    load_type: LoadType,
    state: &PagingState,
  ) -> Result<LoadOutcome, LoadError> {
    let (page, kind) = match load_type {
      LoadType::Prepend => return Ok(LoadOutcome::end()),
      LoadType::Refresh => (1, PageWriteKind::Refresh),
      LoadType::Append => {
        let key = self
          .store
          .get_remote_key(&self.query_string)
          .await
          .map_err(LoadError::store)?;
        match key.and_then(|k| k.next_page) {
          Some(page) => (page, PageWriteKind::Append),
          None => return Ok(LoadOutcome::end()),
        }
      }
    };

    debug!(
      query = %self.query_string,
      page,
      loaded = state.loaded_items,
      "fetching page"
    );
    let result = self
      .source
      .search(&self.query, Some(page))
      .await
      .inspect_err(|e| warn!(query = %self.query_string, page, error = %e, "page fetch failed"))?;

    let next_page = result.meta.next_page();
    let fetched = result.items.len();
    self
      .store
      .store_page(PageWrite {
        query_string: self.query_string.clone(),
        kind,
        items: result.items,
        next_page,
        now: self.clock.now(),
      })
      .await
      .map_err(LoadError::store)?;

    debug!(query = %self.query_string, page, fetched, ?next_page, "stored page");
    Ok(LoadOutcome { end_of_pagination_reached: next_page.is_none() })
  }
}
