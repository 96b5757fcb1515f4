//! Client for the Wallhaven search API.
//!
//! `GET {base}/search?q=..&page=..&apikey=..&<filters>` returns
//! `{ data: [...], meta: { current_page, last_page, per_page, total } }`.
//! Fields the cache has no column for are kept in the wallpaper's metadata.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tapet_core::{
  query::SearchQuery,
  source::{PageMeta, SearchPage, SearchSource, TransportError},
  wallpaper::{Resolution, Source, Wallpaper},
};
use tracing::debug;

use crate::transport_error;

pub const DEFAULT_BASE_URL: &str = "https://wallhaven.cc/api/v1";

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct WallhavenConfig {
  pub base_url: String,
  pub api_key:  Option<String>,
  pub timeout:  Duration,
}

impl Default for WallhavenConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_owned(),
      api_key:  None,
      timeout:  Duration::from_secs(30),
    }
  }
}

#[derive(Clone)]
pub struct WallhavenClient {
  client: Client,
  config: WallhavenConfig,
}

impl WallhavenClient {
  pub fn new(config: WallhavenConfig) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn params(&self, query: &SearchQuery, page: Option<u32>) -> Vec<(String, String)> {
    let query = query.normalized();
    let mut params = vec![("q".to_owned(), query.q())];
    params.extend(query.filters.into_iter());
    if let Some(page) = page {
      params.push(("page".to_owned(), page.to_string()));
    }
    if let Some(key) = &self.config.api_key {
      params.push(("apikey".to_owned(), key.clone()));
    }
    params
  }
}

impl SearchSource for WallhavenClient {
  async fn search(
    &self,
    query: &SearchQuery,
    page: Option<u32>,
  ) -> Result<SearchPage, TransportError> {
    let resp = self
      .client
      .get(self.url("/search"))
      .query(&self.params(query, page))
      .send()
      .await
      .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(TransportError::Http { status: status.as_u16() });
    }

    let body = resp.bytes().await.map_err(transport_error)?;
    let parsed: SearchResponse =
      serde_json::from_slice(&body).map_err(|e| TransportError::Protocol(e.to_string()))?;

    let page = parsed.into_page()?;
    debug!(
      page = page.meta.current_page,
      last_page = page.meta.last_page,
      items = page.items.len(),
      "wallhaven search"
    );
    Ok(page)
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
  data: Vec<RawWallpaper>,
  meta: RawMeta,
}

#[derive(Deserialize)]
struct RawMeta {
  #[serde(deserialize_with = "lenient_u64")]
  current_page: u64,
  #[serde(deserialize_with = "lenient_u64")]
  last_page:    u64,
  #[serde(deserialize_with = "lenient_u64")]
  per_page:     u64,
  #[serde(deserialize_with = "lenient_u64")]
  total:        u64,
}

#[derive(Deserialize)]
struct RawWallpaper {
  id:          String,
  path:        String,
  file_size:   u64,
  created_at:  String,
  #[serde(default)]
  resolution:  Option<String>,
  #[serde(default)]
  dimension_x: Option<u32>,
  #[serde(default)]
  dimension_y: Option<u32>,
  #[serde(flatten)]
  extra:       serde_json::Map<String, serde_json::Value>,
}

impl SearchResponse {
  fn into_page(self) -> Result<SearchPage, TransportError> {
    let items = self
      .data
      .into_iter()
      .map(RawWallpaper::into_wallpaper)
      .collect::<Result<Vec<_>, _>>()?;

    Ok(SearchPage {
      items,
      meta: PageMeta {
        current_page: narrow(self.meta.current_page, "current_page")?,
        last_page:    narrow(self.meta.last_page, "last_page")?,
        per_page:     narrow(self.meta.per_page, "per_page")?,
        total:        self.meta.total,
      },
    })
  }
}

impl RawWallpaper {
  fn into_wallpaper(self) -> Result<Wallpaper, TransportError> {
    let resolution = match (self.resolution.as_deref(), self.dimension_x, self.dimension_y) {
      (Some(s), ..) => s
        .parse::<Resolution>()
        .map_err(|e| TransportError::Protocol(format!("wallpaper {}: {e}", self.id)))?,
      (None, Some(w), Some(h)) => Resolution::new(w, h),
      _ => {
        return Err(TransportError::Protocol(format!(
          "wallpaper {} has no resolution",
          self.id
        )));
      }
    };

    let created_at: DateTime<Utc> = NaiveDateTime::parse_from_str(&self.created_at, CREATED_AT_FORMAT)
      .map_err(|e| TransportError::Protocol(format!("wallpaper {} created_at: {e}", self.id)))?
      .and_utc();

    Ok(Wallpaper {
      source: Source::Wallhaven,
      source_id: self.id,
      url: self.path,
      file_size: self.file_size,
      resolution,
      created_at,
      metadata: serde_json::Value::Object(self.extra),
    })
  }
}

fn narrow(value: u64, field: &str) -> Result<u32, TransportError> {
  u32::try_from(value).map_err(|_| TransportError::Protocol(format!("{field} out of range: {value}")))
}

/// Wallhaven sends some counters as strings.
fn lenient_u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum NumOrStr {
    Num(u64),
    Str(String),
  }

  match NumOrStr::deserialize(de)? {
    NumOrStr::Num(n) => Ok(n),
    NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
  }
}

#[cfg(test)]
mod tests {
  use mockito::{Matcher, Server};
  use serde_json::json;

  use super::*;

  fn client(base_url: String, api_key: Option<&str>) -> WallhavenClient {
    WallhavenClient::new(WallhavenConfig {
      base_url,
      api_key: api_key.map(str::to_owned),
      timeout: Duration::from_secs(5),
    })
    .unwrap()
  }

  fn body() -> String {
    json!({
      "data": [
        {
          "id": "94x38z",
          "url": "https://wallhaven.cc/w/94x38z",
          "path": "https://w.wallhaven.cc/full/94/wallhaven-94x38z.jpg",
          "file_size": 2_621_440,
          "resolution": "3840x2160",
          "dimension_x": 3840,
          "dimension_y": 2160,
          "purity": "sfw",
          "category": "general",
          "created_at": "2024-03-01 12:30:00",
        },
        {
          "id": "zy8o1w",
          "path": "https://w.wallhaven.cc/full/zy/wallhaven-zy8o1w.png",
          "file_size": 1000,
          "dimension_x": 1920,
          "dimension_y": 1080,
          "created_at": "2023-12-31 23:59:59",
        }
      ],
      "meta": { "current_page": 2, "last_page": 10, "per_page": "24", "total": 238 }
    })
    .to_string()
  }

  #[tokio::test]
  async fn search_sends_query_and_parses_page() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/search")
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("q".into(), "cats -rain".into()),
        Matcher::UrlEncoded("purity".into(), "100".into()),
        Matcher::UrlEncoded("page".into(), "2".into()),
        Matcher::UrlEncoded("apikey".into(), "secret".into()),
      ]))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body())
      .create_async()
      .await;

    let mut query = SearchQuery::with_includes(["Cats"]);
    query.excludes.push("rain".into());
    query.filters.insert("purity".into(), "100".into());

    let page = client(server.url(), Some("secret"))
      .search(&query, Some(2))
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(page.meta.current_page, 2);
    assert_eq!(page.meta.per_page, 24);
    assert_eq!(page.meta.next_page(), Some(3));
    assert_eq!(page.items.len(), 2);

    let first = &page.items[0];
    assert_eq!(first.source, Source::Wallhaven);
    assert_eq!(first.source_id, "94x38z");
    assert_eq!(first.resolution, Resolution::new(3840, 2160));
    assert_eq!(first.file_size, 2_621_440);
    assert_eq!(first.created_at.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    assert_eq!(first.metadata["purity"], "sfw");

    assert_eq!(page.items[1].resolution, Resolution::new(1920, 1080));
  }

  #[tokio::test]
  async fn error_status_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/search")
      .match_query(Matcher::Any)
      .with_status(429)
      .create_async()
      .await;

    let err = client(server.url(), None)
      .search(&SearchQuery::default(), None)
      .await
      .unwrap_err();
    assert_eq!(err, TransportError::Http { status: 429 });
  }

  #[tokio::test]
  async fn malformed_body_is_a_protocol_error() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/search")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_body(r#"{"data": "nope"}"#)
      .create_async()
      .await;

    let err = client(server.url(), None)
      .search(&SearchQuery::default(), None)
      .await
      .unwrap_err();
    assert!(matches!(err, TransportError::Protocol(_)));
  }

  #[test]
  fn missing_resolution_is_rejected() {
    let raw: RawWallpaper = serde_json::from_value(json!({
      "id": "x",
      "path": "https://h/x.jpg",
      "file_size": 1,
      "created_at": "2024-01-01 00:00:00",
    }))
    .unwrap();
    assert!(matches!(raw.into_wallpaper(), Err(TransportError::Protocol(_))));
  }
}
