//! HTTP adapters: the Wallhaven search API and a streaming file downloader.

pub mod download;
pub mod wallhaven;

pub use download::HttpDownloader;
pub use wallhaven::{WallhavenClient, WallhavenConfig};

use tapet_core::source::TransportError;

/// Classify a `reqwest` failure. Status errors keep their code, body decode
/// failures are protocol errors, everything else is I/O.
pub(crate) fn transport_error(e: reqwest::Error) -> TransportError {
  if let Some(status) = e.status() {
    TransportError::Http { status: status.as_u16() }
  } else if e.is_decode() {
    TransportError::Protocol(e.to_string())
  } else {
    TransportError::Io(e.to_string())
  }
}
