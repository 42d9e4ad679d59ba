//! Handler for `POST /events/object-finalized`, the ingestion trigger.
//!
//! Called once per finalized storage object. Objects that are not documents,
//! or that carry no `fileID` metadata, are skipped with a `200` so the
//! delivery is not retried. Store and producer failures surface as non-2xx
//! responses.

use std::collections::HashMap;

use axum::{Json, extract::State};
use bytes::Bytes;
use redline_core::{
  feedback::AnalysisContent,
  producer::Producer,
  source::DocumentSource,
  store::VersionStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, error::ApiError};

/// Extracted text shorter than this is suspicious but still analysed.
const MIN_TEXT_CHARS: usize = 100;

// ─── Event ───────────────────────────────────────────────────────────────────

/// A storage "object finalized" notification.
///
/// Metadata values are user-supplied and untyped; only string values count.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectFinalized {
  pub name:     Option<String>,
  pub bucket:   Option<String>,
  pub metadata: Option<HashMap<String, Value>>,
}

impl ObjectFinalized {
  /// Parse a raw body; a body that is not a notification reads as empty and
  /// is skipped like one with no name.
  pub fn parse(body: &[u8]) -> Self {
    serde_json::from_slice(body).unwrap_or_else(|e| {
      tracing::warn!(error = %e, "unreadable object notification");
      Self::default()
    })
  }

  fn file_id(&self) -> Option<&str> {
    self
      .metadata
      .as_ref()?
      .get("fileID")?
      .as_str()
      .filter(|s| !s.trim().is_empty())
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  MissingName,
  NotADocument,
  MissingBucket,
  MissingFileId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
  Skipped {
    reason: SkipReason,
  },
  Recorded {
    #[serde(rename = "analysisID")]
    analysis_id: String,
  },
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `POST /events/object-finalized`
pub async fn handler<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  body: Bytes,
) -> Result<Json<IngestOutcome>, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let event = ObjectFinalized::parse(&body);
  ingest(&state, &event).await.map(Json)
}

/// Run one ingestion: load the document, analyse it, append version `n+1`.
pub async fn ingest<S, P, D>(
  state: &AppState<S, P, D>,
  event: &ObjectFinalized,
) -> Result<IngestOutcome, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let skip = |reason| Ok(IngestOutcome::Skipped { reason });

  let Some(name) = event.name.as_deref().filter(|n| !n.is_empty()) else {
    tracing::error!("object notification without a name; skipping");
    return skip(SkipReason::MissingName);
  };
  if !name.ends_with(state.ingest.document_extension.as_str()) {
    tracing::debug!(name, "not a document; skipping");
    return skip(SkipReason::NotADocument);
  }
  let Some(bucket) = event.bucket.as_deref().filter(|b| !b.is_empty()) else {
    tracing::error!(name, "object notification without a bucket; skipping");
    return skip(SkipReason::MissingBucket);
  };
  let Some(file_id) = event.file_id() else {
    tracing::error!(bucket, name, "object has no fileID metadata; skipping");
    return skip(SkipReason::MissingFileId);
  };

  let text = state
    .documents
    .load_text(bucket, name)
    .await
    .map_err(ApiError::unavailable)?;
  let chars = text.trim().chars().count();
  if chars < MIN_TEXT_CHARS {
    tracing::warn!(file_id, name, chars, "extracted text is unusually short");
  }

  let raw = state
    .producer
    .generate(&text)
    .await
    .map_err(ApiError::unavailable)?;
  let content = AnalysisContent::from_raw(&raw);
  if content.is_unparsed() {
    tracing::warn!(
      file_id,
      "producer output did not match the feedback schema; storing raw text"
    );
  }

  let analysis_id = state
    .store
    .append_initial_analysis(file_id, content, state.producer.model())
    .await
    .map_err(ApiError::store)?;

  tracing::info!(file_id, analysis_id = %analysis_id, "initial analysis recorded");
  Ok(IngestOutcome::Recorded { analysis_id })
}
