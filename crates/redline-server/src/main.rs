//! redline-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! version store, and serves the Redline API over HTTP.

mod settings;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use redline_api::{AppState, FsDocumentSource};
use redline_producer::GeminiProducer;
use redline_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Redline analysis versioning server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

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

  let server_cfg = settings::load(&cli.config).context("failed to load configuration")?;

  let store_path    = settings::expand_tilde(&server_cfg.store_path);
  let document_root = settings::expand_tilde(&server_cfg.document_root);

  let store = SqliteStore::open_with(&store_path, server_cfg.store.options())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let producer = GeminiProducer::new(server_cfg.producer.clone())
    .context("failed to build the Gemini client")?;
  tracing::info!(
    model = %server_cfg.producer.model,
    location = %server_cfg.producer.location,
    "producer configured"
  );

  let state = AppState {
    store:     Arc::new(store),
    producer:  Arc::new(producer),
    documents: Arc::new(FsDocumentSource::new(document_root)),
    ingest:    Arc::new(server_cfg.ingest.clone()),
  };

  let app = redline_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
