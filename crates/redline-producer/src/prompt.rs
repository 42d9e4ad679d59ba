//! Prompt construction for resume review.

use redline_core::producer::RevisionContext;
use serde_json::{Value, json};

/// The output contract, spelled out for the model.
pub const SCHEMA: &str = r#"{
  "summary": "2-4 sentences",
  "strengths": ["..."],
  "gaps": ["..."],
  "suggested_improvements": ["..."],
  "role_suggestions": ["..."],
  "keywords": {
    "skills": ["normalized technical skills"],
    "tools": ["frameworks/libraries"],
    "domains": ["areas like backend, ML, data"],
    "seniority": "Junior|Mid|Senior"
  }
}"#;

pub fn system_instruction() -> String {
  format!(
    "You are an expert resume reviewer for software/tech roles.\n\
     Return STRICT JSON with the following schema:\n{SCHEMA}"
  )
}

pub fn initial_prompt(text: &str) -> String {
  format!(
    "Resume text:\n{text}\n\nGenerate the JSON now. Do not include explanations."
  )
}

pub fn revision_prompt(context: &RevisionContext<'_>) -> serde_json::Result<String> {
  let prior = serde_json::to_string(context.prior)?;
  Ok(format!(
    "You are an expert resume reviewer for software/tech roles. \
     Here's the previous analysis:\n{prior}\n\n\
     The user provided the following feedback:\n\
     - Rating: {rating}\n\
     - Comment: {comment}\n\n\
     Generate a revised analysis using the same schema as before:\n{SCHEMA}\n\n\
     Return only the JSON.",
    rating = context.user_rating,
    comment = context.user_comment,
  ))
}

/// `contents` for a first analysis: the instruction and the document as two
/// user turns.
pub fn initial_contents(text: &str) -> Value {
  json!([
    { "role": "user", "parts": [{ "text": system_instruction() }] },
    { "role": "user", "parts": [{ "text": initial_prompt(text) }] },
  ])
}

pub fn revision_contents(context: &RevisionContext<'_>) -> serde_json::Result<Value> {
  Ok(json!([
    { "role": "user", "parts": [{ "text": revision_prompt(context)? }] },
  ]))
}
