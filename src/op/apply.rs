//! The shared change-application step of merge, rebase, and
//! cherry-pick.
//!
//! `apply_commit_changes(target, head)` replays the diff introduced by
//! `target` (relative to its first parent) onto the current head's tree,
//! merging per path with diff3. Paths are processed in lexicographic
//! order; each path's working-tree write happens before the final index
//! update.

use std::collections::BTreeSet;

use tracing::debug;

use crate::diff::merge_text;
use crate::error::Result;
use crate::model::Oid;
use crate::repo::Repository;

/// What applying one commit onto the head produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// Paths left conflict-marked and staged at 1/2/3.
    pub conflict_files: Vec<String>,
    /// Paths whose working tree and stage-0 entry changed cleanly.
    pub changed_files: Vec<String>,
    /// The applied commit's message (for the follow-up commit).
    pub commit_message: String,
}

impl ApplyResult {
    /// Returns `true` when no path conflicted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflict_files.is_empty()
    }
}

impl Repository {
    /// Replay the change of `target` onto `head`.
    ///
    /// For every path in `parent(target) ∪ target ∪ head`:
    /// unchanged-by-target and already-applied paths are skipped;
    /// target-side deletions either delete outright (ours unchanged) or
    /// three-way merge against empty content to preserve our edits;
    /// everything else runs a diff3 of (parent, head, target).
    ///
    /// Clean merges are written and staged; dirty merges are written
    /// conflict-marked and recorded at stages 1/2/3 without staging.
    ///
    /// # Errors
    /// Missing or corrupt objects, filesystem failures.
    pub fn apply_commit_changes(
        &self,
        target: Oid,
        head: Oid,
        label_ours: &str,
        label_theirs: &str,
    ) -> Result<ApplyResult> {
        let target_commit = self.read_commit(target)?;
        let parent_blobs = self.flatten_commit(target_commit.parents.first().copied())?;
        let target_blobs = self.flatten_commit(Some(target))?;
        let head_blobs = self.flatten_commit(Some(head))?;

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(parent_blobs.keys());
        paths.extend(target_blobs.keys());
        paths.extend(head_blobs.keys());

        let mut index = self.load_index()?;
        let mut result = ApplyResult {
            commit_message: target_commit.message.clone(),
            ..ApplyResult::default()
        };

        for path in paths {
            let p = parent_blobs.get(path).copied();
            let t = target_blobs.get(path).copied();
            let h = head_blobs.get(path).copied();

            if p == t {
                continue; // target did not touch this path
            }
            if h == t {
                continue; // already applied
            }

            let abs = self.work_path(path);
            if t.is_none() {
                if h == p {
                    // Plain deletion.
                    if self.store().exists(&abs)? {
                        self.store().unlink(&abs)?;
                        self.prune_empty_dirs(&abs);
                    }
                    index.remove(path);
                    result.changed_files.push(path.clone());
                } else {
                    // Target deleted what we changed: merge against
                    // empty content to keep our side visible.
                    let base = self.blob_text(p)?;
                    let ours = self.blob_text(h)?;
                    let merged = merge_text(&base, &ours, "", label_ours, label_theirs);
                    self.store()
                        .write_file_all(&abs, merged.text.as_bytes())?;
                    if merged.clean {
                        let oid = self.write_blob(merged.text.as_bytes())?;
                        index.set(path, oid);
                        result.changed_files.push(path.clone());
                    } else {
                        index.set_conflict(path, p, h, None);
                        result.conflict_files.push(path.clone());
                    }
                }
                continue;
            }

            let base = self.blob_text(p)?;
            let ours = self.blob_text(h)?;
            let theirs = self.blob_text(t)?;
            let merged = merge_text(&base, &ours, &theirs, label_ours, label_theirs);
            self.store().write_file_all(&abs, merged.text.as_bytes())?;
            if merged.clean {
                let oid = self.write_blob(merged.text.as_bytes())?;
                index.set(path, oid);
                result.changed_files.push(path.clone());
            } else {
                index.set_conflict(path, p, h, t);
                result.conflict_files.push(path.clone());
            }
        }

        self.save_index(&index)?;
        debug!(
            changed = result.changed_files.len(),
            conflicts = result.conflict_files.len(),
            target = %target.short(),
            "applied commit changes"
        );
        Ok(result)
    }

    /// Decode a blob as text; `None` decodes to the empty string.
    pub(crate) fn blob_text(&self, oid: Option<Oid>) -> Result<String> {
        match oid {
            None => Ok(String::new()),
            Some(oid) => Ok(String::from_utf8_lossy(&self.read_blob(oid)?).into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::{FileStore, MemStore};

    use super::*;
    use crate::config::Identity;
    use crate::worktree::CheckoutOpts;

    fn setup() -> (Arc<dyn FileStore>, Repository) {
        let store: Arc<dyn FileStore> = Arc::new(MemStore::new());
        let (repo, _) = Repository::init(Arc::clone(&store), "/", "main").unwrap();
        (store, repo)
    }

    fn commit_all(repo: &Repository, msg: &str) -> Oid {
        repo.add(".").unwrap();
        repo.commit(Some(msg), &Identity::default())
            .unwrap()
            .oid()
            .expect("commit created")
    }

    fn apply(repo: &Repository, target: Oid) -> ApplyResult {
        let head = repo.head_oid().unwrap().unwrap();
        repo.apply_commit_changes(target, head, "HEAD", "pick")
            .unwrap()
    }

    #[test]
    fn non_overlapping_change_applies_cleanly() {
        let (s, repo) = setup();
        s.write_file("/a.txt", b"a\n").unwrap();
        let base = commit_all(&repo, "base");

        // A side commit adding a new file.
        s.write_file("/b.txt", b"b\n").unwrap();
        let side = commit_all(&repo, "add b");

        // Rewind to base and apply the side commit.
        repo.write_ref("refs/heads/main", base, true).unwrap();
        repo.checkout(&CheckoutOpts::force("main")).unwrap();
        let result = apply(&repo, side);
        assert!(result.is_clean());
        assert_eq!(result.changed_files, vec!["b.txt"]);
        assert_eq!(result.commit_message, "add b");
        assert_eq!(s.read_file("/b.txt").unwrap(), b"b\n");
        assert!(repo.load_index().unwrap().staged_oid("b.txt").is_some());
    }

    #[test]
    fn overlapping_edit_conflicts_with_markers() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"line\n").unwrap();
        let base = commit_all(&repo, "base");

        s.write_file("/f.txt", b"their change\n").unwrap();
        let side = commit_all(&repo, "their change");

        repo.write_ref("refs/heads/main", base, true).unwrap();
        repo.checkout(&CheckoutOpts::force("main")).unwrap();
        s.write_file("/f.txt", b"our change\n").unwrap();
        commit_all(&repo, "our change");

        let result = apply(&repo, side);
        assert_eq!(result.conflict_files, vec!["f.txt"]);
        let text = String::from_utf8(s.read_file("/f.txt").unwrap()).unwrap();
        assert!(text.contains("<<<<<<<"));
        assert!(text.contains("======="));
        assert!(text.contains(">>>>>>>"));
        // Conflict is staged at 1/2/3, not at 0.
        let index = repo.load_index().unwrap();
        assert!(index.is_conflicted("f.txt"));
        assert!(index.staged_oid("f.txt").is_none());
    }

    #[test]
    fn already_applied_change_is_skipped() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"same\n").unwrap();
        let base = commit_all(&repo, "base");
        s.write_file("/f.txt", b"new\n").unwrap();
        let side = commit_all(&repo, "change");
        // Head already has the change (we are at `side` itself).
        let result = apply(&repo, side);
        assert!(result.is_clean());
        assert!(result.changed_files.is_empty());
        let _ = base;
    }

    #[test]
    fn plain_deletion_applies() {
        let (s, repo) = setup();
        s.write_file("/doomed.txt", b"bye\n").unwrap();
        s.write_file("/keep.txt", b"keep\n").unwrap();
        let base = commit_all(&repo, "base");
        s.unlink("/doomed.txt").unwrap();
        let side = commit_all(&repo, "delete doomed");

        repo.write_ref("refs/heads/main", base, true).unwrap();
        repo.checkout(&CheckoutOpts::force("main")).unwrap();
        let result = apply(&repo, side);
        assert!(result.is_clean());
        assert_eq!(result.changed_files, vec!["doomed.txt"]);
        assert!(!s.exists("/doomed.txt").unwrap());
    }

    #[test]
    fn delete_versus_edit_records_delete_conflict() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"original\n").unwrap();
        let base = commit_all(&repo, "base");
        s.unlink("/f.txt").unwrap();
        let side = commit_all(&repo, "delete f");

        repo.write_ref("refs/heads/main", base, true).unwrap();
        repo.checkout(&CheckoutOpts::force("main")).unwrap();
        s.write_file("/f.txt", b"our edit\n").unwrap();
        commit_all(&repo, "edit f");

        let result = apply(&repo, side);
        assert_eq!(result.conflict_files, vec!["f.txt"]);
        // Our side stays visible inside the markers.
        let text = String::from_utf8(s.read_file("/f.txt").unwrap()).unwrap();
        assert!(text.contains("our edit"));
        let index = repo.load_index().unwrap();
        assert!(index.is_conflicted("f.txt"));
        // Theirs side is absent (stage 3 missing).
        assert!(index.get("f.txt", crate::index::STAGE_THEIRS).is_none());
    }

    #[test]
    fn paths_processed_in_lexicographic_order() {
        let (s, repo) = setup();
        s.write_file("/z.txt", b"z\n").unwrap();
        s.write_file("/a.txt", b"a\n").unwrap();
        let base = commit_all(&repo, "base");
        s.write_file("/z.txt", b"z2\n").unwrap();
        s.write_file("/a.txt", b"a2\n").unwrap();
        let side = commit_all(&repo, "both");

        repo.write_ref("refs/heads/main", base, true).unwrap();
        repo.checkout(&CheckoutOpts::force("main")).unwrap();
        let result = apply(&repo, side);
        assert_eq!(result.changed_files, vec!["a.txt", "z.txt"]);
    }
}
