//! Periodic job loop for `tapet run`.
//!
//! Cleanup runs on start and then every [`CLEANUP_INTERVAL`]. Rotation runs
//! every `frequency` minutes as read from the stored preferences, re-read
//! after each rotation so changes apply from the next cycle. Each job is
//! awaited in the loop, so jobs never overlap.

use std::{future::Future, sync::Arc, time::Duration};

use tapet_core::{
  policy::CLEANUP_INTERVAL,
  source::{Downloader, SearchSource},
  store::WallpaperStore,
};
use tapet_engine::{
  RotationError,
  cleanup::CleanupJob,
  rotation::{RotationEngine, RotationRequest},
};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Lower bound on the rotation period.
pub const MIN_ROTATION_PERIOD: Duration = Duration::from_secs(15 * 60);

pub struct Scheduler<S, R, D> {
  store:    Arc<S>,
  rotation: RotationEngine<S, R, D>,
  cleanup:  CleanupJob<S>,
}

impl<S, R, D> Scheduler<S, R, D>
where
  S: WallpaperStore,
  R: SearchSource,
  D: Downloader,
{
  pub fn new(store: Arc<S>, rotation: RotationEngine<S, R, D>, cleanup: CleanupJob<S>) -> Self {
    Self { store, rotation, cleanup }
  }

  /// Run until `shutdown` resolves.
  pub async fn run(&self, shutdown: impl Future<Output = ()>) {
    let cleanup_period = CLEANUP_INTERVAL.to_std().unwrap_or(Duration::from_secs(24 * 60 * 60));
    let mut cleanup_tick = tokio::time::interval(cleanup_period);
    cleanup_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut next_rotation = Instant::now() + self.rotation_period().await;
    tokio::pin!(shutdown);

    loop {
      tokio::select! {
        () = &mut shutdown => {
          info!("scheduler stopping");
          return;
        }
        _ = cleanup_tick.tick() => self.run_cleanup().await,
        () = tokio::time::sleep_until(next_rotation) => {
          self.run_rotation().await;
          next_rotation = Instant::now() + self.rotation_period().await;
        }
      }
    }
  }

  async fn run_cleanup(&self) {
    if let Err(e) = self.cleanup.run().await {
      warn!(error = %e, "cleanup failed");
    }
  }

  async fn run_rotation(&self) {
    match self.rotation.rotate(RotationRequest::default()).await {
      Ok(success) => debug!(source_id = %success.wallpaper.source_id, "scheduled rotation done"),
      Err(RotationError::Disabled) => debug!("auto wallpaper disabled, skipping rotation"),
      Err(e) => warn!(error = %e, "scheduled rotation failed"),
    }
  }

  async fn rotation_period(&self) -> Duration {
    let minutes = match self.store.get_auto_wallpaper_preferences().await {
      Ok(prefs) => prefs.frequency,
      Err(e) => {
        warn!(error = %e, "cannot read preferences, using default period");
        tapet_core::prefs::AutoWallpaperPreferences::default().frequency
      }
    };
    let period = Duration::from_secs(minutes.saturating_mul(60)).max(MIN_ROTATION_PERIOD);
    debug!(minutes = period.as_secs() / 60, "next rotation scheduled");
    period
  }
}
