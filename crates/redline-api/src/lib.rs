//! JSON HTTP front door for Redline.
//!
//! Exposes an axum [`Router`] backed by any [`VersionStore`], [`Producer`] and
//! [`DocumentSource`]. Auth and TLS are the caller's responsibility.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/generateNewAnalysis` | Revision endpoint; see [`revise`] |
//! | `POST` | `/events/object-finalized` | Ingestion trigger; see [`ingest`] |
//! | `POST` | `/files` | Register an uploaded file |
//! | `GET`  | `/files/{id}` | File record with its analysis index |
//! | `GET`  | `/files/{id}/analyses` | All analyses in version order |
//! | `GET`  | `/analyses/{id}` | Single analysis |

pub mod analyses;
pub mod documents;
pub mod error;
pub mod files;
pub mod ingest;
pub mod revise;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use redline_core::{producer::Producer, source::DocumentSource, store::VersionStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use documents::FsDocumentSource;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_document_extension() -> String { ".pdf".into() }

/// Ingestion settings, deserialised from the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
  /// Objects whose name does not end with this are ignored.
  #[serde(default = "default_document_extension")]
  pub document_extension: String,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self { document_extension: default_document_extension() }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, P, D> {
  pub store:     Arc<S>,
  pub producer:  Arc<P>,
  pub documents: Arc<D>,
  pub ingest:    Arc<IngestConfig>,
}

// Not derived: `S`, `P` and `D` need not be `Clone`.
impl<S, P, D> Clone for AppState<S, P, D> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      producer:  Arc::clone(&self.producer),
      documents: Arc::clone(&self.documents),
      ingest:    Arc::clone(&self.ingest),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, P, D>(state: AppState<S, P, D>) -> Router
where
  S: VersionStore + 'static,
  P: Producer + 'static,
  D: DocumentSource + 'static,
{
  Router::new()
    .route("/generateNewAnalysis", post(revise::handler::<S, P, D>))
    .route("/events/object-finalized", post(ingest::handler::<S, P, D>))
    .route("/files", post(files::register::<S, P, D>))
    .route("/files/{id}", get(files::get_one::<S, P, D>))
    .route("/files/{id}/analyses", get(files::history::<S, P, D>))
    .route("/analyses/{id}", get(analyses::get_one::<S, P, D>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
