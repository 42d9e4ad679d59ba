//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Analysis content is stored
//! as compact JSON.

use chrono::{DateTime, Utc};
use redline_core::{analysis::Analysis, feedback::AnalysisContent, file::FileRecord};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── AnalysisContent ─────────────────────────────────────────────────────────

pub fn encode_content(content: &AnalysisContent) -> Result<String> {
  Ok(serde_json::to_string(content)?)
}

pub fn decode_content(s: &str) -> Result<AnalysisContent> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const FILE_COLUMNS: &str =
  "file_id, owner, num_analysis, last_update, created_at";

/// Raw values read from a `files` row plus its index rows.
pub struct RawFile {
  pub file_id:      String,
  pub owner:        String,
  pub num_analysis: u32,
  pub last_update:  Option<String>,
  pub created_at:   String,
  pub index:        Vec<(u32, String)>,
}

impl RawFile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      file_id:      row.get(0)?,
      owner:        row.get(1)?,
      num_analysis: row.get(2)?,
      last_update:  row.get(3)?,
      created_at:   row.get(4)?,
      index:        Vec::new(),
    })
  }

  pub fn into_file(self) -> Result<FileRecord> {
    Ok(FileRecord {
      file_id:        self.file_id,
      owner:          self.owner,
      num_analysis:   self.num_analysis,
      analysis_index: self.index.into_iter().collect(),
      last_update:    self.last_update.as_deref().map(decode_dt).transpose()?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const ANALYSIS_COLUMNS: &str = "analysis_id, file_id, version, owner, \
   content_json, model, generate_time, user_rating, user_comment, \
   next_analysis, revised_from";

/// Raw values read from an `analyses` row.
pub struct RawAnalysis {
  pub analysis_id:   String,
  pub file_id:       String,
  pub version:       u32,
  pub owner:         String,
  pub content_json:  String,
  pub model:         String,
  pub generate_time: String,
  pub user_rating:   Option<String>,
  pub user_comment:  Option<String>,
  pub next_analysis: Option<String>,
  pub revised_from:  Option<String>,
}

impl RawAnalysis {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      analysis_id:   row.get(0)?,
      file_id:       row.get(1)?,
      version:       row.get(2)?,
      owner:         row.get(3)?,
      content_json:  row.get(4)?,
      model:         row.get(5)?,
      generate_time: row.get(6)?,
      user_rating:   row.get(7)?,
      user_comment:  row.get(8)?,
      next_analysis: row.get(9)?,
      revised_from:  row.get(10)?,
    })
  }

  pub fn into_analysis(self) -> Result<Analysis> {
    Ok(Analysis {
      analysis_id:   self.analysis_id,
      file_id:       self.file_id,
      version:       self.version,
      owner:         self.owner,
      content:       decode_content(&self.content_json)?,
      model:         self.model,
      generate_time: decode_dt(&self.generate_time)?,
      user_rating:   self.user_rating,
      user_comment:  self.user_comment,
      next_analysis: self.next_analysis,
      revised_from:  self.revised_from,
    })
  }
}
