//! Error types for `redline-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("file not found: {0}")]
  FileNotFound(String),

  #[error("analysis not found: {0}")]
  AnalysisNotFound(String),

  #[error("file {0} is already registered")]
  FileExists(String),

  /// The store could not obtain a write slot within its retry budget.
  #[error("store unavailable after {attempts} attempts")]
  Unavailable { attempts: u32 },

  /// A write would have re-linked an analysis whose successor is already set.
  #[error("analysis {0} already has a successor")]
  BrokenChain(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
