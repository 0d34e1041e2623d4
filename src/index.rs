//! The index (staged tree), including conflict stages.
//!
//! Persisted at `.git/index` as JSON, entries sorted by `(path, stage)`.
//! Stage 0 is the merged entry; stages 1/2/3 hold base/ours/theirs while
//! a conflict at that path is unresolved. At any path either exactly one
//! stage-0 entry exists, or one each of 1/2/3 (any may be absent when
//! the file did not exist on that side).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::object::MODE_BLOB;
use crate::model::Oid;
use crate::repo::Repository;

/// Stage of an index entry.
pub const STAGE_MERGED: u8 = 0;
/// Conflict stage: common base.
pub const STAGE_BASE: u8 = 1;
/// Conflict stage: our side.
pub const STAGE_OURS: u8 = 2;
/// Conflict stage: their side.
pub const STAGE_THEIRS: u8 = 3;

// ---------------------------------------------------------------------------
// IndexEntry / Index
// ---------------------------------------------------------------------------

/// One staged path at one stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Repo-relative path.
    pub path: String,
    /// Unix-style mode bits.
    pub mode: u32,
    /// The staged blob.
    pub oid: Oid,
    /// 0 merged; 1/2/3 base/ours/theirs of an unresolved conflict.
    pub stage: u8,
}

/// The staged tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    /// All entries, sorted by `(path, stage)`.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The entry at `path` and `stage`, if present.
    #[must_use]
    pub fn get(&self, path: &str, stage: u8) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.path == path && e.stage == stage)
    }

    /// The stage-0 blob at `path`, if present.
    #[must_use]
    pub fn staged_oid(&self, path: &str) -> Option<Oid> {
        self.get(path, STAGE_MERGED).map(|e| e.oid)
    }

    /// Stage a merged entry, clearing any conflict stages at that path.
    ///
    /// Clearing the stages is what marks a conflict resolved.
    pub fn set(&mut self, path: &str, oid: Oid) {
        self.entries.retain(|e| e.path != path);
        self.entries.push(IndexEntry {
            path: path.to_owned(),
            mode: MODE_BLOB,
            oid,
            stage: STAGE_MERGED,
        });
        self.sort();
    }

    /// Record an unresolved conflict at `path`. Absent sides are `None`.
    ///
    /// Any previous entries at the path (including stage 0) are replaced.
    pub fn set_conflict(
        &mut self,
        path: &str,
        base: Option<Oid>,
        ours: Option<Oid>,
        theirs: Option<Oid>,
    ) {
        self.entries.retain(|e| e.path != path);
        for (stage, oid) in [
            (STAGE_BASE, base),
            (STAGE_OURS, ours),
            (STAGE_THEIRS, theirs),
        ] {
            if let Some(oid) = oid {
                self.entries.push(IndexEntry {
                    path: path.to_owned(),
                    mode: MODE_BLOB,
                    oid,
                    stage,
                });
            }
        }
        self.sort();
    }

    /// Drop every entry at `path` (all stages).
    pub fn remove(&mut self, path: &str) {
        self.entries.retain(|e| e.path != path);
    }

    /// Returns `true` if `path` carries conflict-stage entries.
    #[must_use]
    pub fn is_conflicted(&self, path: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.path == path && e.stage != STAGE_MERGED)
    }

    /// Paths that still carry conflict stages, deduplicated and sorted.
    #[must_use]
    pub fn conflicted_paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.stage != STAGE_MERGED)
            .map(|e| e.path.clone())
            .collect();
        out.dedup();
        out
    }

    /// Returns `true` if any path is conflicted.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(|e| e.stage != STAGE_MERGED)
    }

    /// All distinct paths in the index, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.iter().map(|e| e.path.clone()).collect();
        out.dedup();
        out
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| a.path.cmp(&b.path).then(a.stage.cmp(&b.stage)));
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

impl Repository {
    /// Load the index, or an empty one if the file does not exist yet.
    ///
    /// # Errors
    /// Filesystem failures; a malformed index file is treated as corrupt.
    pub fn load_index(&self) -> Result<Index> {
        let p = self.git_path("index");
        if !self.store().exists(&p)? {
            return Ok(Index::default());
        }
        let raw = self.store().read_file(&p)?;
        let mut entries: Vec<IndexEntry> =
            serde_json::from_slice(&raw).map_err(|e| crate::error::GitError::CorruptObject {
                oid: "index".to_owned(),
                detail: e.to_string(),
            })?;
        entries.sort_by(|a, b| a.path.cmp(&b.path).then(a.stage.cmp(&b.stage)));
        Ok(Index { entries })
    }

    /// Persist the index.
    ///
    /// # Errors
    /// Filesystem and serialisation failures.
    pub fn save_index(&self, index: &Index) -> Result<()> {
        let json = serde_json::to_vec_pretty(&index.entries).map_err(|e| {
            crate::error::GitError::CorruptObject {
                oid: "index".to_owned(),
                detail: e.to_string(),
            }
        })?;
        self.store().write_file_all(&self.git_path("index"), &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::MemStore;

    use super::*;

    fn repo() -> Repository {
        let store: Arc<dyn edugit_fs::FileStore> = Arc::new(MemStore::new());
        Repository::init(store, "/", "main").unwrap().0
    }

    #[test]
    fn empty_index_when_missing() {
        let repo = repo();
        let index = repo.load_index().unwrap();
        assert!(index.entries().is_empty());
    }

    #[test]
    fn set_and_persist_roundtrip() {
        let repo = repo();
        let mut index = Index::default();
        index.set("src/b.txt", Oid::hash(b"b"));
        index.set("src/a.txt", Oid::hash(b"a"));
        repo.save_index(&index).unwrap();
        let loaded = repo.load_index().unwrap();
        assert_eq!(loaded, index);
        // Sorted by path.
        assert_eq!(loaded.entries()[0].path, "src/a.txt");
    }

    #[test]
    fn set_replaces_previous_entry() {
        let mut index = Index::default();
        index.set("f", Oid::hash(b"v1"));
        index.set("f", Oid::hash(b"v2"));
        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.staged_oid("f"), Some(Oid::hash(b"v2")));
    }

    #[test]
    fn conflict_stages_replace_stage_zero() {
        let mut index = Index::default();
        index.set("f", Oid::hash(b"merged"));
        index.set_conflict("f", Some(Oid::hash(b"b")), Some(Oid::hash(b"o")), Some(Oid::hash(b"t")));
        assert!(index.is_conflicted("f"));
        assert_eq!(index.get("f", STAGE_MERGED), None);
        assert_eq!(index.get("f", STAGE_BASE).map(|e| e.oid), Some(Oid::hash(b"b")));
        assert_eq!(index.conflicted_paths(), vec!["f"]);
    }

    #[test]
    fn staging_resolves_conflict() {
        let mut index = Index::default();
        index.set_conflict("f", None, Some(Oid::hash(b"o")), Some(Oid::hash(b"t")));
        assert!(index.has_conflicts());
        index.set("f", Oid::hash(b"resolved"));
        assert!(!index.has_conflicts());
        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.entries()[0].stage, STAGE_MERGED);
    }

    #[test]
    fn conflict_with_absent_side() {
        let mut index = Index::default();
        index.set_conflict("gone", Some(Oid::hash(b"b")), Some(Oid::hash(b"o")), None);
        assert_eq!(index.entries().len(), 2);
        assert!(index.is_conflicted("gone"));
    }

    #[test]
    fn remove_clears_all_stages() {
        let mut index = Index::default();
        index.set_conflict("f", Some(Oid::hash(b"b")), Some(Oid::hash(b"o")), Some(Oid::hash(b"t")));
        index.remove("f");
        assert!(index.entries().is_empty());
    }
}
