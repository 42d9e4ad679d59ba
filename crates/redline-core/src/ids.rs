//! Analysis identifiers.
//!
//! An analysis is addressed as `"{file_id}-{version}"`, where `version` is
//! its 1-based position in the file's version chain. File ids may themselves
//! contain `-`, so parsing always happens relative to a known file id.

/// Build the identifier of version `version` of `file_id`.
pub fn analysis_id(file_id: &str, version: u32) -> String {
  format!("{file_id}-{version}")
}

/// Recover the version number from an analysis id belonging to `file_id`.
///
/// Returns `None` if `analysis_id` does not belong to `file_id` or carries no
/// valid (non-zero) version suffix.
pub fn version_of(file_id: &str, analysis_id: &str) -> Option<u32> {
  let suffix = analysis_id.strip_prefix(file_id)?.strip_prefix('-')?;
  if suffix.starts_with('+') || suffix.starts_with('0') {
    return None;
  }
  suffix.parse().ok().filter(|v| *v > 0)
}
