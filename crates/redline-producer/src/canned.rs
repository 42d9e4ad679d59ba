//! A producer that replays fixed replies, for tests and offline runs.

use std::sync::{
  Mutex,
  atomic::{AtomicUsize, Ordering},
};

use redline_core::producer::{Producer, RevisionContext};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("canned producer failure: {0}")]
pub struct CannedError(pub String);

/// Returns the same reply (or failure) to every call and remembers the last
/// input it was given.
pub struct CannedProducer {
  model:      String,
  reply:      Result<String, String>,
  calls:      AtomicUsize,
  last_input: Mutex<Option<String>>,
}

impl CannedProducer {
  /// A producer that always answers `reply`.
  pub fn replying(model: impl Into<String>, reply: impl Into<String>) -> Self {
    Self::new(model.into(), Ok(reply.into()))
  }

  /// A producer whose every call fails with `message`.
  pub fn failing(model: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(model.into(), Err(message.into()))
  }

  fn new(model: String, reply: Result<String, String>) -> Self {
    Self {
      model,
      reply,
      calls: AtomicUsize::new(0),
      last_input: Mutex::new(None),
    }
  }

  /// Number of generate/revise calls so far.
  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  /// The document text, or the revision prompt, of the latest call.
  pub fn last_input(&self) -> Option<String> {
    self.last_input.lock().ok().and_then(|g| g.clone())
  }

  fn answer(&self, input: String) -> Result<String, CannedError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut slot) = self.last_input.lock() {
      *slot = Some(input);
    }
    self.reply.clone().map_err(CannedError)
  }
}

impl Producer for CannedProducer {
  type Error = CannedError;

  fn model(&self) -> &str { &self.model }

  async fn generate(&self, text: &str) -> Result<String, CannedError> {
    self.answer(text.to_owned())
  }

  async fn revise(&self, context: RevisionContext<'_>) -> Result<String, CannedError> {
    let prompt = crate::prompt::revision_prompt(&context)
      .map_err(|e| CannedError(e.to_string()))?;
    self.answer(prompt)
  }
}
