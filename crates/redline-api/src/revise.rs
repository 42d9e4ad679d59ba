//! Handler for `POST /generateNewAnalysis`, the revision endpoint.
//!
//! Body: `{"fileID", "analysisID", "userRating", "userComment"}`, all
//! required. The prior analysis and the user's reaction go to the producer;
//! its output is appended as the file's next version.
//!
//! | Status | Body |
//! |--------|------|
//! | 200 | `{"newAnalysisID": "..."}` |
//! | 400 | `{"error": "Missing required parameters."}` |
//! | 404 | `{"error": "Analysis document not found."}` / `"File document not found."` |
//! | 503 | `{"error": "Service unavailable."}` (producer failed or store busy) |
//! | 500 | `{"error": "Internal server error."}` |

use axum::{Json, extract::State};
use bytes::Bytes;
use redline_core::{
  feedback::AnalysisContent,
  producer::{Producer, RevisionContext},
  source::DocumentSource,
  store::VersionStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppState, error::ApiError};

// ─── Request ─────────────────────────────────────────────────────────────────

/// The body as sent. Every field is optional here so that a missing field is
/// reported as such rather than as a JSON error.
#[derive(Debug, Default, Deserialize)]
pub struct RevisionBody {
  #[serde(rename = "fileID")]
  pub file_id:      Option<Value>,
  #[serde(rename = "analysisID")]
  pub analysis_id:  Option<Value>,
  #[serde(rename = "userRating")]
  pub user_rating:  Option<Value>,
  #[serde(rename = "userComment")]
  pub user_comment: Option<Value>,
}

/// A validated revision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRequest {
  pub file_id:      String,
  pub analysis_id:  String,
  pub user_rating:  String,
  pub user_comment: String,
}

impl RevisionBody {
  /// Parse a raw body; anything that is not a JSON object counts as empty.
  pub fn parse(body: &[u8]) -> Self { serde_json::from_slice(body).unwrap_or_default() }

  pub fn validate(self) -> Result<RevisionRequest, ApiError> {
    let (Some(file_id), Some(analysis_id), Some(user_rating), Some(user_comment)) = (
      text(self.file_id),
      text(self.analysis_id),
      rating(self.user_rating),
      text(self.user_comment),
    ) else {
      return Err(ApiError::MissingParameters);
    };
    Ok(RevisionRequest { file_id, analysis_id, user_rating, user_comment })
  }
}

/// A non-blank string.
fn text(v: Option<Value>) -> Option<String> {
  match v? {
    Value::String(s) if !s.trim().is_empty() => Some(s),
    _ => None,
  }
}

/// Ratings arrive as numbers or strings; both are passed on as text.
fn rating(v: Option<Value>) -> Option<String> {
  match v? {
    Value::Number(n) => Some(n.to_string()),
    other => text(Some(other)),
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RevisionResponse {
  #[serde(rename = "newAnalysisID")]
  pub new_analysis_id: String,
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// `POST /generateNewAnalysis`
pub async fn handler<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  body: Bytes,
) -> Result<Json<RevisionResponse>, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let request = RevisionBody::parse(&body).validate()?;
  let new_analysis_id = revise(&state, &request).await?;
  Ok(Json(RevisionResponse { new_analysis_id }))
}

/// Produce and append a revision of `request.analysis_id`.
///
/// The producer runs before the store transaction; a retried transaction
/// reuses its output.
pub async fn revise<S, P, D>(
  state: &AppState<S, P, D>,
  request: &RevisionRequest,
) -> Result<String, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let prior = state
    .store
    .get_analysis(&request.analysis_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::AnalysisNotFound(request.analysis_id.clone()))?;

  // The analysis exists but under another file: report the file if it is
  // unknown, otherwise the analysis.
  if prior.file_id != request.file_id {
    let file = state
      .store
      .get_file(&request.file_id)
      .await
      .map_err(ApiError::store)?;
    return Err(match file {
      None => ApiError::FileNotFound(request.file_id.clone()),
      Some(_) => ApiError::AnalysisNotFound(request.analysis_id.clone()),
    });
  }

  let raw = state
    .producer
    .revise(RevisionContext {
      prior:        &prior.content,
      user_rating:  &request.user_rating,
      user_comment: &request.user_comment,
    })
    .await
    .map_err(ApiError::unavailable)?;

  let content = AnalysisContent::from_raw(&raw);
  if content.is_unparsed() {
    tracing::warn!(
      file_id = %request.file_id,
      prior = %request.analysis_id,
      "producer output did not match the feedback schema; storing raw text"
    );
  }

  let new_id = state
    .store
    .append_revision_analysis(
      &request.file_id,
      &request.analysis_id,
      content,
      state.producer.model(),
    )
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    file_id = %request.file_id,
    prior = %request.analysis_id,
    analysis_id = %new_id,
    "revised analysis recorded"
  );
  Ok(new_id)
}
