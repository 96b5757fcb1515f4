//! Upstream search API and download transport abstractions.
//!
//! Implemented by `tapet-remote`; consumed by the paginator and the rotation
//! engine in `tapet-engine`.

use std::{future::Future, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{query::SearchQuery, wallpaper::Wallpaper};

// ─── Transport errors ────────────────────────────────────────────────────────

/// A failure talking to an upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  /// Connection, timeout or local file I/O failure.
  #[error("i/o error: {0}")]
  Io(String),

  /// The upstream answered with a non-success status.
  #[error("http status {status}")]
  Http { status: u16 },

  /// The upstream answered, but not with something we understand.
  #[error("protocol error: {0}")]
  Protocol(String),
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// Pagination metadata returned with every upstream page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
  pub current_page: u32,
  pub last_page:    u32,
  pub per_page:     u32,
  pub total:        u64,
}

impl PageMeta {
  /// The page to fetch after this one, or `None` if this was the last.
  pub fn next_page(&self) -> Option<u32> {
    if self.current_page >= self.last_page {
      None
    } else {
      Some(self.current_page + 1)
    }
  }
}

/// One page of upstream search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
  pub items: Vec<Wallpaper>,
  pub meta:  PageMeta,
}

/// A paginated upstream search API.
pub trait SearchSource: Send + Sync {
  /// Fetch one page of results. `page` is 1-based; `None` means the first.
  fn search<'a>(
    &'a self,
    query: &'a SearchQuery,
    page: Option<u32>,
  ) -> impl Future<Output = Result<SearchPage, TransportError>> + Send + 'a;
}

// ─── Download ────────────────────────────────────────────────────────────────

/// Progress callback: `(bytes_written, total_if_known)`.
pub type Progress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Streams a remote file to disk.
pub trait Downloader: Send + Sync {
  /// Download `url` into `dest`, truncating any existing file. Returns the
  /// number of bytes written.
  fn download<'a>(
    &'a self,
    url: &'a str,
    dest: &'a Path,
    progress: Progress<'a>,
  ) -> impl Future<Output = Result<u64, TransportError>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn meta(current_page: u32, last_page: u32) -> PageMeta {
    PageMeta { current_page, last_page, per_page: 20, total: 198 }
  }

  #[test]
  fn next_page_advances_until_last() {
    assert_eq!(meta(1, 10).next_page(), Some(2));
    assert_eq!(meta(9, 10).next_page(), Some(10));
    assert_eq!(meta(10, 10).next_page(), None);
  }

  #[test]
  fn single_page_result_has_no_next() {
    assert_eq!(meta(1, 1).next_page(), None);
  }
}
