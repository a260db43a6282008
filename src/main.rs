mod app;
mod commands;
mod config;
mod context;
mod event;
mod logging;
mod notes;
mod query;
mod remote;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::context::AppContext;
use crate::notes::NotesApi;
use crate::query::QueryClient;
use crate::remote::{MemoryClient, RemoteDataClient, RestClient, SessionUser};
use crate::ui::view::Route;

const DEMO_USER: &str = "demo-user";

#[derive(Parser, Debug)]
#[command(name = "notebook")]
#[command(about = "A terminal note-taking client for a hosted notes backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/notebook/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Open this note instead of the list
  #[arg(short, long)]
  note: Option<String>,

  /// Run against an in-memory backend; no config or account needed
  #[arg(long)]
  demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let (remote, user, backend, cache, _log_guard) = if args.demo {
    let guard = logging::init(&config::LoggingConfig::default())?;
    info!("starting in demo mode");
    let remote: Arc<dyn RemoteDataClient> = Arc::new(MemoryClient::new(DEMO_USER));
    let user = SessionUser {
      id: DEMO_USER.to_string(),
      email: Some("demo@localhost".to_string()),
    };
    (remote, user, "in-memory demo".to_string(), QueryClient::new(), guard)
  } else {
    let config = config::Config::load(args.config.as_deref())?;
    let guard = logging::init(&config.logging)?;

    let anon_key = config.backend.anon_key()?;
    let password = config::Config::get_password()?;
    let client = RestClient::sign_in(&config.backend, anon_key, &config.auth.email, &password)
      .await
      .map_err(|e| eyre!("Sign in as {} failed: {}", config.auth.email, e))?;

    let user = client.user().clone();
    let cache = QueryClient::new().with_stale_time(config.cache.stale_time());
    (
      Arc::new(client) as Arc<dyn RemoteDataClient>,
      user,
      config.backend.url.clone(),
      cache,
      guard,
    )
  };

  let ctx = AppContext::new(NotesApi::new(remote, Some(user)), cache);
  let initial = match args.note {
    Some(id) => Route::Note(id),
    None => Route::Notes,
  };

  let mut app = app::App::new(ctx, backend, initial);
  app.run().await?;

  info!("exiting");
  Ok(())
}
