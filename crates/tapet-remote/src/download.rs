//! Streaming HTTP downloads straight to disk.

use std::{path::Path, time::Duration};

use futures_util::StreamExt as _;
use reqwest::Client;
use tapet_core::source::{Downloader, Progress, TransportError};
use tokio::io::AsyncWriteExt as _;
use tracing::debug;

use crate::transport_error;

#[derive(Clone)]
pub struct HttpDownloader {
  client: Client,
}

impl HttpDownloader {
  pub fn new(timeout: Duration) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

fn io_error(e: std::io::Error) -> TransportError { TransportError::Io(e.to_string()) }

impl Downloader for HttpDownloader {
  async fn download(
    &self,
    url: &str,
    dest: &Path,
    progress: Progress<'_>,
  ) -> Result<u64, TransportError> {
    let resp = self.client.get(url).send().await.map_err(transport_error)?;
    let status = resp.status();
    if !status.is_success() {
      return Err(TransportError::Http { status: status.as_u16() });
    }

    let total = resp.content_length();
    let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;
    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(transport_error)?;
      file.write_all(&chunk).await.map_err(io_error)?;
      written += chunk.len() as u64;
      progress(written, total);
    }
    file.flush().await.map_err(io_error)?;

    debug!(url, dest = %dest.display(), bytes = written, "downloaded");
    Ok(written)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU64, Ordering};

  use mockito::Server;

  use super::*;

  #[tokio::test]
  async fn streams_body_to_file_and_reports_progress() {
    let mut server = Server::new_async().await;
    let payload = vec![7u8; 4096];
    let mock = server
      .mock("GET", "/full/a.jpg")
      .with_status(200)
      .with_body(payload.clone())
      .create_async()
      .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.jpg");
    let last = AtomicU64::new(0);
    let progress = |written: u64, _total: Option<u64>| last.store(written, Ordering::SeqCst);

    let written = HttpDownloader::new(Duration::from_secs(5))
      .unwrap()
      .download(&format!("{}/full/a.jpg", server.url()), &dest, &progress)
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(written, 4096);
    assert_eq!(last.load(Ordering::SeqCst), 4096);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
  }

  #[tokio::test]
  async fn missing_file_is_an_http_error() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/full/gone.jpg")
      .with_status(404)
      .create_async()
      .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("gone.jpg");
    let err = HttpDownloader::new(Duration::from_secs(5))
      .unwrap()
      .download(&format!("{}/full/gone.jpg", server.url()), &dest, &|_, _| {})
      .await
      .unwrap_err();

    assert_eq!(err, TransportError::Http { status: 404 });
    assert!(!dest.exists());
  }
}
