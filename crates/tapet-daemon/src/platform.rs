//! Platform adapters for a desktop host: wallpapers are applied by running a
//! configured command and notifications go to the log.

use std::{
  path::Path,
  sync::{Mutex, PoisonError},
  time::Duration,
};

use async_trait::async_trait;
use tapet_core::{
  crop::Rect,
  platform::{Display, Notifier, PlatformError, WallpaperSetter},
  prefs::Targets,
  wallpaper::Wallpaper,
};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// Runs a command template such as `swww img {path}`.
///
/// Placeholders are substituted inside each whitespace-separated argument:
/// `{path}` is the image, `{crop}` is `WxH+X+Y` and `{target}` is `home`,
/// `lock` or `both`.
///
/// A command that exits within the settle time is judged by its exit status.
/// One still running after that (`swaybg` and friends draw until killed) is
/// kept as the resident setter and counts as applied; the previous resident
/// is killed once its replacement is up.
pub struct CommandSetter {
  template: Vec<String>,
  display:  Display,
  settle:   Duration,
  resident: Mutex<Option<Child>>,
}

impl CommandSetter {
  pub fn new(command: &str, display: Display) -> Self {
    Self {
      template: command.split_whitespace().map(str::to_owned).collect(),
      display,
      settle: DEFAULT_SETTLE,
      resident: Mutex::new(None),
    }
  }

  pub fn with_settle(mut self, settle: Duration) -> Self {
    self.settle = settle;
    self
  }

  fn args(&self, image: &Path, crop: Rect, target: &str) -> Vec<String> {
    let path = image.to_string_lossy();
    let crop = format!("{}x{}+{}+{}", crop.width(), crop.height(), crop.left, crop.top);
    self
      .template
      .iter()
      .map(|arg| {
        arg
          .replace("{path}", &path)
          .replace("{crop}", &crop)
          .replace("{target}", target)
      })
      .collect()
  }

  fn keep_resident(&self, child: Child) {
    let previous = self
      .resident
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .replace(child);
    if let Some(mut previous) = previous
      && let Err(e) = previous.start_kill()
    {
      warn!(error = %e, "cannot stop previous set command");
    }
  }
}

fn target_name(targets: Targets) -> Option<&'static str> {
  match (targets.home, targets.lock) {
    (true, true) => Some("both"),
    (true, false) => Some("home"),
    (false, true) => Some("lock"),
    (false, false) => None,
  }
}

#[async_trait]
impl WallpaperSetter for CommandSetter {
  fn display(&self) -> Display { self.display.clone() }

  async fn set_wallpaper(
    &self,
    screen: &Display,
    image: &Path,
    crop: Rect,
    targets: Targets,
  ) -> Result<bool, PlatformError> {
    let Some(target) = target_name(targets) else {
      warn!("no wallpaper target selected");
      return Ok(false);
    };

    let args = self.args(image, crop, target);
    let Some((program, rest)) = args.split_first() else {
      return Err("set_command is empty".into());
    };

    debug!(display = %screen.name, program, ?rest, "running set command");
    let mut child = Command::new(program).args(rest).spawn()?;
    match tokio::time::timeout(self.settle, child.wait()).await {
      Ok(status) => {
        let status = status?;
        if !status.success() {
          warn!(program, code = ?status.code(), "set command failed");
        }
        Ok(status.success())
      }
      Err(_) => {
        info!(program, pid = ?child.id(), "set command still running, keeping it resident");
        self.keep_resident(child);
        Ok(true)
      }
    }
  }
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn notify(&self, wallpaper: &Wallpaper, image: &Path) -> Result<(), PlatformError> {
    info!(
      source = %wallpaper.source,
      source_id = %wallpaper.source_id,
      resolution = %wallpaper.resolution,
      path = %image.display(),
      "new wallpaper"
    );
    Ok(())
  }
}
