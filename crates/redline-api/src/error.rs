//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use redline_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing required parameters")]
  MissingParameters,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("file not found: {0}")]
  FileNotFound(String),

  #[error("analysis not found: {0}")]
  AnalysisNotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The model or the store could not serve the request right now.
  #[error("unavailable: {0}")]
  Unavailable(#[source] BoxError),

  #[error("internal error: {0}")]
  Internal(#[source] BoxError),
}

impl ApiError {
  /// Classify a store error by its domain cause.
  pub fn store<E: StoreError>(e: E) -> Self {
    use redline_core::Error as Core;
    match e.as_core() {
      Some(Core::FileNotFound(id)) => Self::FileNotFound(id.clone()),
      Some(Core::AnalysisNotFound(id)) => Self::AnalysisNotFound(id.clone()),
      Some(Core::FileExists(id)) => Self::Conflict(format!("File {id} already exists.")),
      Some(Core::Unavailable { .. }) => Self::Unavailable(Box::new(e)),
      _ => Self::Internal(Box::new(e)),
    }
  }

  /// A dependency outside the store (the producer, the document source)
  /// failed; never a bug in the request.
  pub fn unavailable<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Unavailable(Box::new(e))
  }

  pub fn internal<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Internal(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::MissingParameters => {
        (StatusCode::BAD_REQUEST, "Missing required parameters.".to_owned())
      }
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::FileNotFound(_) => {
        (StatusCode::NOT_FOUND, "File document not found.".to_owned())
      }
      ApiError::AnalysisNotFound(_) => {
        (StatusCode::NOT_FOUND, "Analysis document not found.".to_owned())
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unavailable(e) => {
        tracing::error!(error = %e, "request failed: dependency unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable.".to_owned())
      }
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed: internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
