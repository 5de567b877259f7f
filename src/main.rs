mod api;
mod app;
mod cache;
mod commands;
mod config;
mod db;
mod event;
mod notify;
mod pagination;
mod query;
mod routes;
mod search;
mod session;
mod state;
mod ui;
mod validation;

use clap::Parser;
use color_eyre::Result;
use db::Preferences;
use event::EventHandler;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var holding the log filter, e.g. `KEYDECK_LOG=keydeck=debug`
const LOG_ENV: &str = "KEYDECK_LOG";

#[derive(Parser, Debug)]
#[command(name = "keydeck")]
#[command(about = "A terminal dashboard for a license-key service")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./keydeck.yaml, then $XDG_CONFIG_HOME/keydeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the key service, overrides the config file
  #[arg(short, long)]
  url: Option<String>,
}

/// Log to a daily file in the data directory; the terminal belongs to the UI.
/// The guard must live until exit or buffered lines are lost.
fn init_logging() -> Result<WorkerGuard> {
  let dir = Preferences::data_dir()?;
  std::fs::create_dir_all(&dir)?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    &dir,
    "keydeck.log",
  ));

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .init();
  Ok(guard)
}

/// color-eyre reports, with the terminal restored before a panic prints
fn install_hooks() -> Result<()> {
  let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
  eyre_hook.install()?;

  let panic_hook = panic_hook.into_panic_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = app::restore_terminal();
    panic_hook(info);
  }));
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  install_hooks()?;
  let args = Args::parse();

  // Logging is optional: no writable data directory just means no log file
  let _guard = init_logging().ok();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }
  info!(api = %config.api.url, "starting");

  let prefs = match Preferences::open() {
    Ok(prefs) => prefs,
    Err(e) => {
      warn!(error = %e, "preferences unavailable, nothing will be remembered");
      Preferences::in_memory()?
    }
  };

  let mut app = app::App::new(&config, prefs, EventHandler::new())?;
  app.run().await?;

  info!("exiting");
  Ok(())
}
