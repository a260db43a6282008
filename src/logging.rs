use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "NOTEBOOK_LOG";
const DEFAULT_FILTER: &str = "notebook=info";
const LOG_FILE: &str = "notebook.log";

/// Install the global subscriber, writing to a daily rolling file.
///
/// The terminal belongs to the UI, so nothing is logged to stdout. Keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
  let directory = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_directory()?,
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let file_appender = tracing_appender::rolling::daily(&directory, LOG_FILE);
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| DEFAULT_FILTER.into());

  tracing_subscriber::registry()
    .with(env_filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_ansi(false) // no ANSI in files
        .with_writer(non_blocking),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn default_directory() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|dir| dir.join("notebook").join("logs"))
    .ok_or_else(|| eyre!("No data directory found. Set logging.directory in the config."))
}
