//! Daemon configuration: an optional TOML file layered under `TAPET_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
  pub store_path:        PathBuf,
  pub temp_dir:          PathBuf,
  /// Where applied remote wallpapers are copied when the `download`
  /// preference is on.
  pub downloads_dir:     Option<PathBuf>,
  pub wallhaven_url:     String,
  pub wallhaven_api_key: Option<String>,
  /// Command run to apply a wallpaper. `{path}`, `{crop}` and `{target}` are
  /// substituted per argument.
  pub set_command:       String,
  /// Seconds to wait for the set command to exit. A command still running
  /// after that is left in the background as the resident setter.
  pub set_settle_secs:   u64,
  pub display_width:     u32,
  pub display_height:    u32,
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      store_path:        PathBuf::from("~/.local/share/tapet/tapet.db"),
      temp_dir:          PathBuf::from("~/.cache/tapet"),
      downloads_dir:     None,
      wallhaven_url:     tapet_remote::wallhaven::DEFAULT_BASE_URL.to_owned(),
      wallhaven_api_key: None,
      set_command:       "swww img {path}".to_owned(),
      set_settle_secs:   5,
      display_width:     1920,
      display_height:    1080,
    }
  }
}

impl DaemonConfig {
  /// Read `path` if it exists, then apply `TAPET_*` overrides. Paths get a
  /// leading `~` expanded.
  pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
    let settings = ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(::config::Environment::with_prefix("TAPET"))
      .build()?;

    let mut cfg: Self = settings.try_deserialize()?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    cfg.temp_dir = expand_tilde(&cfg.temp_dir);
    cfg.downloads_dir = cfg.downloads_dir.as_deref().map(expand_tilde);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
