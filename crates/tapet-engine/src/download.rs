//! Size-verified downloads into the temp cache.

use std::path::PathBuf;

use tapet_core::{policy::MAX_DOWNLOAD_ATTEMPTS, source::Downloader, wallpaper::Wallpaper};
use tracing::{debug, trace, warn};

use crate::{
  error::DownloadError,
  tempfiles::{remove_if_present, TempCache},
};

/// Download `wallpaper` into its temp file, retrying up to
/// [`MAX_DOWNLOAD_ATTEMPTS`] times. A file whose length differs from the
/// declared size is deleted before the next attempt. An existing temp file
/// of the right size is reused without touching the network.
///
/// A declared size of zero means the size is unknown. Any non-empty download
/// is then accepted, but a leftover temp file is never trusted and is
/// downloaded again.
pub async fn download_verified<D: Downloader>(
  downloader: &D,
  temp: &TempCache,
  wallpaper: &Wallpaper,
) -> Result<PathBuf, DownloadError> {
  temp.ensure_dir().await?;
  let path = temp.path_for(&wallpaper.url);
  let expected = wallpaper.file_size;

  if expected > 0
    && let Ok(meta) = tokio::fs::metadata(&path).await
    && meta.len() == expected
  {
    debug!(path = %path.display(), "reusing cached download");
    return Ok(path);
  }

  let url = wallpaper.url.as_str();
  let progress = move |written: u64, total: Option<u64>| {
    trace!(url, written, ?total, "download progress");
  };

  for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
    match downloader.download(url, &path, &progress).await {
      Ok(_) => {
        let actual = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        if size_matches(expected, actual) {
          debug!(url, attempt, bytes = actual, "download verified");
          return Ok(path);
        }
        warn!(url, attempt, expected, actual, "downloaded file has the wrong size");
      }
      Err(e) => warn!(url, attempt, error = %e, "download failed"),
    }

    if let Err(e) = remove_if_present(&path).await {
      warn!(path = %path.display(), error = %e, "cannot remove partial download");
    }
  }

  Err(DownloadError::Exhausted { attempts: MAX_DOWNLOAD_ATTEMPTS })
}

fn size_matches(expected: u64, actual: u64) -> bool {
  if expected == 0 { actual > 0 } else { actual == expected }
}
