//! `tapet`: wallpaper rotation daemon.
//!
//! Reads `tapet.toml` (or the path given with `--config`) and `TAPET_*`
//! environment variables, opens the SQLite cache and runs one of the
//! subcommands below.
//!
//! ```
//! tapet search add nature nature forest --filter purity=100
//! tapet prefs set prefs.json
//! tapet run
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context as _, anyhow, bail};
use clap::{Parser, Subcommand};
use tapet_core::{
  clock::{Clock, SystemClock},
  platform::Display,
  prefs::AutoWallpaperPreferences,
  query::SearchQuery,
  store::WallpaperStore,
  wallpaper::Resolution,
};
use tapet_daemon::{
  DaemonConfig,
  platform::{CommandSetter, LogNotifier},
  scheduler::Scheduler,
};
use tapet_engine::{
  cleanup::CleanupJob,
  local::FsLocalProvider,
  rotation::{Collaborators, RotationEngine, RotationRequest},
  tempfiles::TempCache,
};
use tapet_remote::{HttpDownloader, WallhavenClient, WallhavenConfig};
use tapet_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Wallpaper rotation daemon")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tapet.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Run cleanup and rotation on their schedules until Ctrl-C.
  Run,
  /// Rotate the wallpaper once.
  Rotate {
    /// Rotate even if auto wallpaper is disabled.
    #[arg(long)]
    force: bool,
  },
  /// Run one cleanup pass.
  Clean,
  /// Manage saved searches.
  #[command(subcommand)]
  Search(SearchCommand),
  /// Show or replace auto wallpaper preferences.
  #[command(subcommand)]
  Prefs(PrefsCommand),
  /// Manage the history of applied wallpapers.
  #[command(subcommand)]
  History(HistoryCommand),
}

#[derive(Subcommand)]
enum SearchCommand {
  Add {
    name:     String,
    #[arg(required = true)]
    terms:    Vec<String>,
    /// Term results must not match. Repeatable.
    #[arg(long = "exclude", value_name = "TERM")]
    excludes: Vec<String>,
    /// Upstream filter such as `purity=100`. Repeatable.
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters:  Vec<(String, String)>,
  },
  List,
  Remove { id: i64 },
}

#[derive(Subcommand)]
enum PrefsCommand {
  Show,
  /// Replace preferences with the contents of a JSON file.
  Set { file: PathBuf },
}

#[derive(Subcommand)]
enum HistoryCommand {
  Clear,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = DaemonConfig::load(&cli.config).context("failed to load configuration")?;

  if let Some(parent) = cfg.store_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&cfg.store_path)
      .await
      .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?,
  );

  match cli.command {
    Command::Run => {
      let scheduler = Scheduler::new(
        store.clone(),
        rotation_engine(&cfg, &store)?,
        cleanup_job(&cfg, &store),
      );
      tracing::info!("tapet running, press Ctrl-C to stop");
      scheduler
        .run(async {
          if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
          }
        })
        .await;
    }

    Command::Rotate { force } => {
      let success = rotation_engine(&cfg, &store)?
        .rotate(RotationRequest { force })
        .await
        .context("rotation failed")?;
      println!(
        "{} {} via {} -> {}",
        success.wallpaper.source,
        success.wallpaper.source_id,
        success.source_choice,
        success.path.display()
      );
    }

    Command::Clean => {
      let report = cleanup_job(&cfg, &store).run().await.context("cleanup failed")?;
      println!(
        "deleted {} queries, {} wallpapers, {} files",
        report.queries_deleted, report.wallpapers_deleted, report.files_deleted
      );
    }

    Command::Search(SearchCommand::Add { name, terms, excludes, filters }) => {
      let query = SearchQuery {
        includes: terms,
        excludes,
        filters: filters.into_iter().collect(),
      }
      .normalized();
      let saved = store.add_saved_search(name, query).await?;
      println!("{}\t{}\t{}", saved.id, saved.name, saved.query.to_query_string());
    }

    Command::Search(SearchCommand::List) => {
      for saved in store.list_saved_searches().await? {
        println!("{}\t{}\t{}", saved.id, saved.name, saved.query.to_query_string());
      }
    }

    Command::Search(SearchCommand::Remove { id }) => {
      if !store.delete_saved_search(id).await? {
        bail!("no saved search with id {id}");
      }
    }

    Command::Prefs(PrefsCommand::Show) => {
      let prefs = store.get_auto_wallpaper_preferences().await?;
      println!("{}", serde_json::to_string_pretty(&prefs)?);
    }

    Command::Prefs(PrefsCommand::Set { file }) => {
      let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {file:?}"))?;
      let prefs: AutoWallpaperPreferences =
        serde_json::from_str(&raw).context("invalid preferences JSON")?;
      if prefs.saved_search_enabled {
        let id = prefs
          .saved_search_id
          .ok_or_else(|| anyhow!("saved_search_enabled requires saved_search_id"))?;
        if store.get_saved_search(id).await?.is_none() {
          bail!("no saved search with id {id}");
        }
      }
      store.set_auto_wallpaper_preferences(prefs).await?;
    }

    Command::History(HistoryCommand::Clear) => {
      let n = store.clear_history().await?;
      println!("cleared {n} history entries");
    }
  }

  Ok(())
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

fn clock() -> Arc<dyn Clock> { Arc::new(SystemClock) }

fn cleanup_job(cfg: &DaemonConfig, store: &Arc<SqliteStore>) -> CleanupJob<SqliteStore> {
  CleanupJob::new(store.clone(), TempCache::new(&cfg.temp_dir), clock())
}

fn rotation_engine(
  cfg: &DaemonConfig,
  store: &Arc<SqliteStore>,
) -> anyhow::Result<RotationEngine<SqliteStore, WallhavenClient, HttpDownloader>> {
  let wallhaven = WallhavenClient::new(WallhavenConfig {
    base_url: cfg.wallhaven_url.clone(),
    api_key:  cfg.wallhaven_api_key.clone(),
    timeout:  HTTP_TIMEOUT,
  })
  .context("failed to build Wallhaven client")?;
  let downloader = HttpDownloader::new(HTTP_TIMEOUT).context("failed to build HTTP client")?;

  let screen = Display {
    name:       "default".to_owned(),
    resolution: Resolution::new(cfg.display_width, cfg.display_height),
  };
  let collaborators = Collaborators {
    favorites: store.clone(),
    local:     Arc::new(FsLocalProvider),
    detector:  None,
    setter:    Arc::new(
      CommandSetter::new(&cfg.set_command, screen)
        .with_settle(Duration::from_secs(cfg.set_settle_secs)),
    ),
    notifier:  Arc::new(LogNotifier),
  };

  let engine = RotationEngine::new(
    store.clone(),
    Arc::new(wallhaven),
    Arc::new(downloader),
    collaborators,
    TempCache::new(&cfg.temp_dir),
    clock(),
  );
  Ok(match &cfg.downloads_dir {
    Some(dir) => engine.with_downloads_dir(dir),
    None => engine,
  })
}
