//! The `VersionStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `redline-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  analysis::Analysis,
  feedback::AnalysisContent,
  file::{FileRecord, NewFile},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend errors expose the domain failure behind them, if there is one, so
/// callers can tell "not found" from "database on fire" without knowing the
/// backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn as_core(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Redline version store backend.
///
/// Analyses are append-only. Both append operations run as a single
/// transaction that serialises on the file record: two concurrent appends to
/// the same file never allocate the same version, and a failed append leaves
/// no trace.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait VersionStore: Send + Sync {
  type Error: StoreError;

  // ── Files ─────────────────────────────────────────────────────────────

  /// Register a new file with no analyses.
  ///
  /// Returns [`crate::Error::FileExists`] if the id is already taken.
  fn register_file(
    &self,
    input: NewFile,
  ) -> impl Future<Output = Result<FileRecord, Self::Error>> + Send + '_;

  /// Retrieve a file by id. Returns `None` if not found.
  fn get_file<'a>(
    &'a self,
    file_id: &'a str,
  ) -> impl Future<Output = Result<Option<FileRecord>, Self::Error>> + Send + 'a;

  // ── Analyses: reads ──────────────────────────────────────────────────

  /// Retrieve an analysis by id. Returns `None` if not found.
  fn get_analysis<'a>(
    &'a self,
    analysis_id: &'a str,
  ) -> impl Future<Output = Result<Option<Analysis>, Self::Error>> + Send + 'a;

  /// All analyses of a file, in version order.
  fn list_analyses<'a>(
    &'a self,
    file_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Analysis>, Self::Error>> + Send + 'a;

  // ── Analyses: append-only writes ─────────────────────────────────────

  /// Append the analysis produced for a freshly uploaded document and return
  /// its id.
  ///
  /// Fails with [`crate::Error::FileNotFound`] if the file is not registered.
  /// Not idempotent: a retried call appends another version.
  fn append_initial_analysis<'a>(
    &'a self,
    file_id: &'a str,
    content: AnalysisContent,
    model: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Append a revision of `prior_analysis_id` and return the new id.
  ///
  /// The version number is allocated from the file's counter as read inside
  /// the append transaction. Fails with [`crate::Error::FileNotFound`] or
  /// [`crate::Error::AnalysisNotFound`] (also when the prior analysis belongs
  /// to another file).
  fn append_revision_analysis<'a>(
    &'a self,
    file_id: &'a str,
    prior_analysis_id: &'a str,
    content: AnalysisContent,
    model: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
