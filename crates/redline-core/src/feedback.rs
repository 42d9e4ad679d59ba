//! The structured feedback schema and the analysis content envelope.
//!
//! A producer is asked to return a [`Feedback`] object as JSON. Models do not
//! always comply, so stored content is an [`AnalysisContent`]: either the
//! parsed feedback or the raw text wrapped as `{"rawText": "..."}`.

use serde::{Deserialize, Serialize};

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Seniority level inferred from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seniority {
  Junior,
  Mid,
  Senior,
}

/// Normalised keywords extracted alongside the feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
  /// Normalised technical skills.
  pub skills:    Vec<String>,
  /// Frameworks and libraries.
  pub tools:     Vec<String>,
  /// Areas such as backend, ML, data.
  pub domains:   Vec<String>,
  pub seniority: Seniority,
}

/// Structured feedback for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
  /// Two to four sentences.
  pub summary:                String,
  pub strengths:              Vec<String>,
  pub gaps:                   Vec<String>,
  pub suggested_improvements: Vec<String>,
  pub role_suggestions:       Vec<String>,
  pub keywords:               Keywords,
}

// ─── Content envelope ────────────────────────────────────────────────────────

/// The `content` field of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisContent {
  Feedback(Feedback),
  /// Producer output that did not conform to the schema, kept verbatim.
  Unparsed {
    #[serde(rename = "rawText")]
    raw_text: String,
  },
}

impl AnalysisContent {
  /// Interpret raw producer output.
  ///
  /// Never fails: output that cannot be parsed as [`Feedback`] becomes
  /// [`AnalysisContent::Unparsed`] carrying the original, untrimmed text.
  pub fn from_raw(raw: &str) -> Self {
    match serde_json::from_str::<Feedback>(strip_code_fence(raw)) {
      Ok(feedback) => Self::Feedback(feedback),
      Err(_) => Self::Unparsed { raw_text: raw.to_owned() },
    }
  }

  pub fn is_unparsed(&self) -> bool { matches!(self, Self::Unparsed { .. }) }

  pub fn feedback(&self) -> Option<&Feedback> {
    match self {
      Self::Feedback(f) => Some(f),
      Self::Unparsed { .. } => None,
    }
  }
}

/// Remove a single surrounding Markdown code fence (```` ```json ... ``` ````).
fn strip_code_fence(raw: &str) -> &str {
  let trimmed = raw.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let Some(body) = rest.strip_suffix("```") else {
    return trimmed;
  };
  // Drop the info string (e.g. `json`) on the opening line.
  match body.split_once('\n') {
    Some((_, inner)) => inner.trim(),
    None => body.trim(),
  }
}
