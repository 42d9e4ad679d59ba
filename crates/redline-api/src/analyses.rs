//! Handler for `GET /analyses/{id}`.

use axum::{
  Json,
  extract::{Path, State},
};
use redline_core::{
  analysis::Analysis,
  producer::Producer,
  source::DocumentSource,
  store::VersionStore,
};

use crate::{AppState, error::ApiError};

/// `GET /analyses/{id}`
pub async fn get_one<S, P, D>(
  State(state): State<AppState<S, P, D>>,
  Path(id): Path<String>,
) -> Result<Json<Analysis>, ApiError>
where
  S: VersionStore,
  P: Producer,
  D: DocumentSource,
{
  let analysis = state
    .store
    .get_analysis(&id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::AnalysisNotFound(id))?;
  Ok(Json(analysis))
}
