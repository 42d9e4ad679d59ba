//! File record, one per uploaded document.
//!
//! A file owns its analysis version sequence. The counter and the index are
//! denormalised onto the record so that every append serialises on it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
  #[serde(rename = "fileID")]
  pub file_id:        String,
  pub owner:          String,
  /// Number of analysis versions appended so far.
  #[serde(rename = "numAnalysis")]
  pub num_analysis:   u32,
  /// Version number → analysis id; append-only.
  #[serde(rename = "analysisIndex")]
  pub analysis_index: BTreeMap<u32, String>,
  /// Time of the most recent append; `None` until the first one.
  #[serde(rename = "lastUpdate")]
  pub last_update:    Option<DateTime<Utc>>,
  #[serde(rename = "createdAt")]
  pub created_at:     DateTime<Utc>,
}

impl FileRecord {
  /// The id of the newest analysis, if any.
  pub fn latest_analysis(&self) -> Option<&str> {
    self.analysis_index.get(&self.num_analysis).map(String::as_str)
  }
}

/// Input to [`crate::store::VersionStore::register_file`].
#[derive(Debug, Clone)]
pub struct NewFile {
  /// Externally assigned id; the store generates one when `None`.
  pub file_id: Option<String>,
  pub owner:   String,
}
