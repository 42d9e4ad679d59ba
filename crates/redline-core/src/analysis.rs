//! Analysis record, one per generated feedback result.
//!
//! Analyses are written once. The only later mutations are the `next_analysis`
//! backlink, set by the append that follows, and the user-feedback fields,
//! which belong to a separate collection path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::AnalysisContent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
  #[serde(rename = "analysisID")]
  pub analysis_id:   String,
  #[serde(rename = "fileID")]
  pub file_id:       String,
  /// 1-based position in the file's version chain.
  pub version:       u32,
  /// Copied from the file at creation time.
  pub owner:         String,
  pub content:       AnalysisContent,
  /// Identifier of the generation model.
  pub model:         String,
  #[serde(rename = "generateTime")]
  pub generate_time: DateTime<Utc>,
  #[serde(rename = "userRating")]
  pub user_rating:   Option<String>,
  #[serde(rename = "userComment")]
  pub user_comment:  Option<String>,
  /// The analysis appended after this one; write-once.
  #[serde(rename = "nextAnalysis")]
  pub next_analysis: Option<String>,
  /// For revisions, the analysis the user asked to have revised.
  #[serde(rename = "revisedFrom")]
  pub revised_from:  Option<String>,
}

impl Analysis {
  pub fn is_latest(&self) -> bool { self.next_analysis.is_none() }
}
