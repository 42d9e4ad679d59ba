//! The structured-feedback producer seam.
//!
//! A producer turns document text (or a previous analysis plus the user's
//! reaction to it) into raw model output. Producers return the text as-is;
//! interpreting it is [`AnalysisContent::from_raw`]'s job, so a producer that
//! ignores the schema still yields a storable analysis.

use std::future::Future;

use crate::feedback::AnalysisContent;

/// Everything a producer needs to revise an earlier analysis.
#[derive(Debug, Clone, Copy)]
pub struct RevisionContext<'a> {
  pub prior:        &'a AnalysisContent,
  pub user_rating:  &'a str,
  pub user_comment: &'a str,
}

pub trait Producer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Identifier recorded as the analysis `model`.
  fn model(&self) -> &str;

  /// Generate feedback for freshly extracted document text.
  fn generate<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Generate a revised analysis.
  fn revise<'a>(
    &'a self,
    context: RevisionContext<'a>,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
