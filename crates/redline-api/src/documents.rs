//! Filesystem-backed [`DocumentSource`].
//!
//! Objects live at `{root}/{bucket}/{name}`. PDFs (recognised by their
//! `%PDF-` header) go through `pdf-extract`; anything else is decoded as lossy
//! UTF-8.

use std::path::{Component, Path, PathBuf};

use redline_core::source::DocumentSource;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("object path escapes the document root: {0:?}")]
  InvalidPath(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("pdf text extraction failed: {0}")]
  Pdf(String),
}

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone)]
pub struct FsDocumentSource {
  root: PathBuf,
}

impl FsDocumentSource {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  fn resolve(&self, bucket: &str, name: &str) -> Result<PathBuf, DocumentError> {
    let mut path = self.root.clone();
    for part in [bucket, name] {
      let relative = Path::new(part);
      if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
      {
        return Err(DocumentError::InvalidPath(format!("{bucket}/{name}")));
      }
      path.push(relative);
    }
    Ok(path)
  }
}

impl DocumentSource for FsDocumentSource {
  type Error = DocumentError;

  async fn load_text(&self, bucket: &str, name: &str) -> Result<String, DocumentError> {
    let path = self.resolve(bucket, name)?;
    let bytes = tokio::fs::read(&path).await?;
    if !bytes.starts_with(PDF_MAGIC) {
      return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    // Extraction is CPU-bound and may panic on hostile input.
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
      .await
      .map_err(|e| DocumentError::Pdf(e.to_string()))?
      .map_err(|e| DocumentError::Pdf(e.to_string()))
  }
}
