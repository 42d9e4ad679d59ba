//! Consistency check for a file's version chain.
//!
//! The chain is recorded twice: as the file's `analysis_index` and as the
//! `next_analysis` links between analyses. [`verify`] checks that both agree
//! with each other and with the version numbering.

use thiserror::Error;

use crate::{analysis::Analysis, file::FileRecord, ids::analysis_id};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
  #[error("num_analysis is {num} but the index has {entries} entries")]
  CountMismatch { num: u32, entries: usize },

  #[error("index entry {version} is {found:?}, expected {expected:?}")]
  IndexEntry {
    version:  u32,
    found:    Option<String>,
    expected: String,
  },

  #[error("expected {expected} analyses, got {found}")]
  MissingAnalyses { expected: u32, found: usize },

  #[error("analysis at position {version} is {found:?}, expected {expected:?}")]
  Order {
    version:  u32,
    found:    String,
    expected: String,
  },

  #[error("analysis {analysis_id} links to {found:?}, expected {expected:?}")]
  Link {
    analysis_id: String,
    found:       Option<String>,
    expected:    Option<String>,
  },
}

/// Verify `file` against its analyses, given in version order.
pub fn verify(file: &FileRecord, analyses: &[Analysis]) -> Result<(), ChainViolation> {
  if file.analysis_index.len() != file.num_analysis as usize {
    return Err(ChainViolation::CountMismatch {
      num:     file.num_analysis,
      entries: file.analysis_index.len(),
    });
  }

  for version in 1..=file.num_analysis {
    let expected = analysis_id(&file.file_id, version);
    let found = file.analysis_index.get(&version);
    if found != Some(&expected) {
      return Err(ChainViolation::IndexEntry {
        version,
        found: found.cloned(),
        expected,
      });
    }
  }

  if analyses.len() != file.num_analysis as usize {
    return Err(ChainViolation::MissingAnalyses {
      expected: file.num_analysis,
      found:    analyses.len(),
    });
  }

  for (pos, analysis) in analyses.iter().enumerate() {
    let version = pos as u32 + 1;
    let expected = analysis_id(&file.file_id, version);
    if analysis.analysis_id != expected || analysis.version != version {
      return Err(ChainViolation::Order {
        version,
        found: analysis.analysis_id.clone(),
        expected,
      });
    }

    let expected_next = (version < file.num_analysis)
      .then(|| analysis_id(&file.file_id, version + 1));
    if analysis.next_analysis != expected_next {
      return Err(ChainViolation::Link {
        analysis_id: analysis.analysis_id.clone(),
        found:       analysis.next_analysis.clone(),
        expected:    expected_next,
      });
    }
  }

  Ok(())
}
