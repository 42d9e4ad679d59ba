//! Vertex AI Gemini producer.
//!
//! Calls `generateContent` with a JSON response MIME type and returns the
//! first candidate's text untouched.

use std::time::Duration;

use redline_core::producer::{Producer, RevisionContext};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{Error, Result, prompt};

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_location() -> String { "us-west1".into() }

fn default_model() -> String { "gemini-2.5-flash".into() }

fn default_timeout_secs() -> u64 { 120 }

/// Connection settings for the Gemini model.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
  pub project_id:   String,
  #[serde(default = "default_location")]
  pub location:     String,
  #[serde(default = "default_model")]
  pub model:        String,
  /// OAuth bearer token; requests are sent unauthenticated when absent.
  #[serde(default)]
  pub access_token: Option<String>,
  /// Overrides `https://{location}-aiplatform.googleapis.com`.
  #[serde(default)]
  pub endpoint:     Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl GeminiConfig {
  fn url(&self) -> String {
    let base = self
      .endpoint
      .clone()
      .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location));
    format!(
      "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
      base.trim_end_matches('/'),
      self.project_id,
      self.location,
      self.model,
    )
  }
}

// ─── Response shape ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
  text: Option<String>,
}

impl GenerateResponse {
  /// Text of the first part of the first candidate, or `"{}"` when the
  /// model returned nothing usable.
  fn into_text(self) -> String {
    self
      .candidates
      .into_iter()
      .next()
      .and_then(|c| c.content)
      .and_then(|c| c.parts.into_iter().next())
      .and_then(|p| p.text)
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| "{}".to_owned())
  }
}

// ─── Producer ────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiProducer {
  client: Client,
  config: GeminiConfig,
  url:    String,
}

impl GeminiProducer {
  pub fn new(config: GeminiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    let url = config.url();
    Ok(Self { client, config, url })
  }

  async fn generate_content(&self, contents: Value) -> Result<String> {
    let body = json!({
      "contents": contents,
      "generationConfig": { "responseMimeType": "application/json" },
    });

    let mut req = self.client.post(&self.url).json(&body);
    if let Some(token) = &self.config.access_token {
      req = req.bearer_auth(token);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      tracing::warn!(%status, model = %self.config.model, "generateContent failed");
      return Err(Error::Status { status: status.as_u16(), body });
    }

    let parsed: GenerateResponse = resp.json().await?;
    Ok(parsed.into_text())
  }
}

impl Producer for GeminiProducer {
  type Error = Error;

  fn model(&self) -> &str { &self.config.model }

  async fn generate(&self, text: &str) -> Result<String> {
    self.generate_content(prompt::initial_contents(text)).await
  }

  async fn revise(&self, context: RevisionContext<'_>) -> Result<String> {
    let contents = prompt::revision_contents(&context)?;
    self.generate_content(contents).await
  }
}
