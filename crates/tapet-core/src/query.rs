//! Search queries and the cache-index types keyed by them.
//!
//! Every cache entry is keyed by the canonical string of a normalised
//! [`SearchQuery`]. Two queries that differ only in term order, case or
//! whitespace share one cache entry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── SearchQuery ─────────────────────────────────────────────────────────────

/// A filter definition sent upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
  /// Terms or tags the results should match.
  #[serde(default)]
  pub includes: Vec<String>,
  /// Terms or tags the results must not match.
  #[serde(default)]
  pub excludes: Vec<String>,
  /// Upstream filters such as `categories`, `purity`, `sorting`, `atleast`.
  #[serde(default)]
  pub filters:  BTreeMap<String, String>,
}

impl SearchQuery {
  pub fn with_includes<I, T>(terms: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    Self {
      includes: terms.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  /// Lowercase, trim and collapse whitespace in every term; drop empty terms
  /// and filters; sort and de-duplicate.
  pub fn normalized(&self) -> Self {
    Self {
      includes: normalize_terms(&self.includes),
      excludes: normalize_terms(&self.excludes),
      filters:  self
        .filters
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_owned()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect(),
    }
  }

  /// The free-text part of the query in upstream syntax: included terms as
  /// is, excluded terms prefixed with `-`.
  pub fn q(&self) -> String { self.normalized().joined_terms() }

  /// Canonical cache key. A pure function of the normalised query.
  pub fn to_query_string(&self) -> String {
    let n = self.normalized();
    let mut out = format!("q={}", n.joined_terms());
    for (k, v) in &n.filters {
      out.push('&');
      out.push_str(k);
      out.push('=');
      out.push_str(v);
    }
    out
  }

  fn joined_terms(&self) -> String {
    self
      .includes
      .iter()
      .cloned()
      .chain(self.excludes.iter().map(|t| format!("-{t}")))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

fn normalize_terms(terms: &[String]) -> Vec<String> {
  let mut out: Vec<String> = terms
    .iter()
    .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
    .filter(|t| !t.is_empty())
    .collect();
  out.sort();
  out.dedup();
  out
}

// ─── Cache index ─────────────────────────────────────────────────────────────

/// One cached result set, keyed by canonical query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQueryEntry {
  pub id:              i64,
  pub query_string:    String,
  /// Last successful refresh; never moves backwards.
  pub last_updated_on: DateTime<Utc>,
}

/// Pagination cursor for one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteKey {
  pub search_query_id: i64,
  /// `None` once the last upstream page has been stored.
  pub next_page:       Option<u32>,
}

// ─── Saved searches ──────────────────────────────────────────────────────────

/// A user-persisted query the rotation engine can draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
  pub id:    i64,
  pub name:  String,
  pub query: SearchQuery,
}
