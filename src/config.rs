use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  pub auth: AuthConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Project URL, e.g. https://xyz.supabase.co
  pub url: String,
  /// Public API key sent with every request (falls back to NOTEBOOK_ANON_KEY)
  pub anon_key: Option<String>,
  /// HTTP request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

impl BackendConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// Resolve the API key from config or the environment.
  pub fn anon_key(&self) -> Result<String> {
    match &self.anon_key {
      Some(key) if !key.is_empty() => Ok(key.clone()),
      _ => std::env::var("NOTEBOOK_ANON_KEY").map_err(|_| {
        eyre!("Backend API key not found. Set backend.anon_key or NOTEBOOK_ANON_KEY.")
      }),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Refetch cached data older than this on the next read. Unset means data
  /// only goes stale through invalidation.
  pub stale_after_secs: Option<u64>,
}

impl CacheConfig {
  pub fn stale_time(&self) -> Option<Duration> {
    self.stale_after_secs.map(Duration::from_secs)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
  /// Directory for log files (default: $XDG_DATA_HOME/notebook/logs)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./notebook.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/notebook/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/notebook/config.yaml\n\
                 or run with --demo to try the app without a backend."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("notebook.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("notebook").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the account password from the environment.
  ///
  /// Checks NOTEBOOK_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("NOTEBOOK_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set NOTEBOOK_PASSWORD environment variable."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
backend:
  url: https://xyz.supabase.co
  anon_key: public-key
  timeout_secs: 5
auth:
  email: me@example.com
cache:
  stale_after_secs: 300
logging:
  directory: /tmp/notebook-logs
"#,
    )
    .unwrap();

    assert_eq!(config.backend.url, "https://xyz.supabase.co");
    assert_eq!(config.backend.anon_key().unwrap(), "public-key");
    assert_eq!(config.backend.timeout(), Duration::from_secs(5));
    assert_eq!(config.auth.email, "me@example.com");
    assert_eq!(config.cache.stale_time(), Some(Duration::from_secs(300)));
    assert_eq!(
      config.logging.directory.as_deref(),
      Some(Path::new("/tmp/notebook-logs"))
    );
  }

  #[test]
  fn test_parse_minimal_config_uses_defaults() {
    let config = Config::parse(
      r#"
backend:
  url: https://xyz.supabase.co
auth:
  email: me@example.com
"#,
    )
    .unwrap();

    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.cache.stale_time(), None);
    assert!(config.logging.directory.is_none());
  }

  #[test]
  fn test_missing_backend_is_an_error() {
    assert!(Config::parse("auth:\n  email: me@example.com\n").is_err());
  }
}
