//! Handlers for `/files` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/files` | Body: `{"owner":"u1"}`, optional `"fileID"`; 409 if taken |
//! | `GET`  | `/files/{id}` | 404 if not found |
//! | `GET`  | `/files/{id}/analyses` | Version order; 404 if the file is unknown |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use redline_core::{
  analysis::Analysis,
  file::{FileRecord, NewFile},
  producer::Producer,
  source::DocumentSource,
  store::VersionStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(rename = "fileID")]
  pub file_id: Option<String>,
  pub owner:   Option<String>,
}

/// `POST /files`
pub async fn register<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let owner = body
    .owner
    .filter(|o| !o.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest("owner is required.".into()))?;
  let file_id = match body.file_id {
    Some(id) if id.trim().is_empty() => {
      return Err(ApiError::BadRequest("fileID must not be blank.".into()));
    }
    other => other,
  };

  let file = state
    .store
    .register_file(NewFile { file_id, owner })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(file_id = %file.file_id, owner = %file.owner, "file registered");
  Ok((StatusCode::CREATED, Json(file)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /files/{id}`
pub async fn get_one<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let file = state
    .store
    .get_file(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::FileNotFound(id))?;
  Ok(Json(file))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /files/{id}/analyses`
pub async fn history<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Analysis>>, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  if state.store.get_file(&id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::FileNotFound(id));
  }
  let analyses = state.store.list_analyses(&id).await.map_err(ApiError::store)?;
  Ok(Json(analyses))
}
