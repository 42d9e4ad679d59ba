//! Server configuration: a TOML file layered with `REDLINE_*` environment
//! variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use redline_api::IngestConfig;
use redline_producer::GeminiConfig;
use redline_store_sqlite::StoreOptions;
use serde::Deserialize;

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_busy_timeout_ms() -> u64 { 5_000 }

fn default_max_attempts() -> u32 { 5 }

fn default_retry_backoff_ms() -> u64 { 50 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Directory holding one subdirectory per storage bucket.
  pub document_root: PathBuf,
  #[serde(flatten)]
  pub ingest:        IngestConfig,
  #[serde(default)]
  pub store:         StoreSettings,
  pub producer:      GeminiConfig,
}

/// Write-contention tuning for the SQLite store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:  u64,
  #[serde(default = "default_max_attempts")]
  pub max_attempts:     u32,
  #[serde(default = "default_retry_backoff_ms")]
  pub retry_backoff_ms: u64,
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      busy_timeout_ms:  default_busy_timeout_ms(),
      max_attempts:     default_max_attempts(),
      retry_backoff_ms: default_retry_backoff_ms(),
    }
  }
}

impl StoreSettings {
  pub fn options(&self) -> StoreOptions {
    StoreOptions {
      busy_timeout:  Duration::from_millis(self.busy_timeout_ms),
      max_attempts:  self.max_attempts.max(1),
      retry_backoff: Duration::from_millis(self.retry_backoff_ms),
    }
  }
}

/// Build the layered configuration: `file` (optional) then the environment.
///
/// Nested keys use `__`, e.g. `REDLINE_STORE__MAX_ATTEMPTS=8` or
/// `REDLINE_PRODUCER__PROJECT_ID=my-project`.
pub fn load(file: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(file).required(false))
    .add_source(
      config::Environment::with_prefix("REDLINE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
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
