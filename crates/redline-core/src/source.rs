//! Where uploaded documents come from.
//!
//! Blob access and binary-to-text extraction sit behind one trait so the
//! ingestion path only ever sees text.

use std::future::Future;

pub trait DocumentSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the object `name` from `bucket` and return its text.
  fn load_text<'a>(
    &'a self,
    bucket: &'a str,
    name: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
