//! Editor-facing projections: HEAD baselines and gutter diffs.
//!
//! The view recomputes a file's gutter projection on buffer edits, on
//! selected-file changes, and whenever the refresh token bumps; stale
//! results are simply discarded and recomputed, so these reads need no
//! locking.

use crate::diff::GutterDiff;
use crate::error::Result;
use crate::repo::Repository;

impl Repository {
    /// The text of `rel` as committed at `HEAD`, or `None` when the
    /// path is not in the head tree (new files diff against empty).
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn head_file_text(&self, rel: &str) -> Result<Option<String>> {
        let head = self.flatten_commit(self.head_oid()?)?;
        match head.get(rel) {
            None => Ok(None),
            Some(oid) => {
                let data = self.read_blob(*oid)?;
                Ok(Some(String::from_utf8_lossy(&data).into_owned()))
            }
        }
    }

    /// Gutter projection of `buffer` (the live editor content of `rel`)
    /// against the `HEAD` baseline.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn gutter_diff(&self, rel: &str, buffer: &str) -> Result<GutterDiff> {
        let baseline = self.head_file_text(rel)?.unwrap_or_default();
        Ok(GutterDiff::compute(&baseline, buffer))
    }
}
