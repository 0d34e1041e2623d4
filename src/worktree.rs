//! Working-tree mutation: `add`, `remove`, `reset_index`, `checkout`,
//! and tree materialisation.
//!
//! Within one operation, each path's working-tree write happens before
//! its index update, and `HEAD` moves last, so a reader observing a new
//! ref always sees a consistent tree.

use std::collections::{BTreeMap, BTreeSet};

use edugit_fs::path;
use tracing::debug;

use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::repo::{Repository, CONTROL_PATHS};
use crate::status::blob_id;

// ---------------------------------------------------------------------------
// CheckoutOpts
// ---------------------------------------------------------------------------

/// Options for [`Repository::checkout`].
#[derive(Clone, Debug, Default)]
pub struct CheckoutOpts {
    /// Branch name or commitish to switch to. `None` means `HEAD`
    /// (useful with `filepaths`).
    pub target: Option<String>,
    /// Restore just these repo-relative paths instead of switching.
    pub filepaths: Option<Vec<String>>,
    /// Discard overlapping working-tree changes instead of aborting.
    pub force: bool,
    /// Rewrite tree and index but leave `HEAD` untouched.
    pub no_update_head: bool,
}

impl CheckoutOpts {
    /// Switch to `target`, aborting on an unclean tree.
    #[must_use]
    pub fn branch(target: &str) -> Self {
        Self {
            target: Some(target.to_owned()),
            ..Self::default()
        }
    }

    /// Forced switch to `target`, discarding local changes.
    #[must_use]
    pub fn force(target: &str) -> Self {
        Self {
            target: Some(target.to_owned()),
            force: true,
            ..Self::default()
        }
    }
}

impl Repository {
    // -----------------------------------------------------------------------
    // add / remove / reset
    // -----------------------------------------------------------------------

    /// Stage `rel` (a file, a directory, or `.` for the whole tree).
    ///
    /// Directory adds recurse, skipping the control paths. Staging a path
    /// clears its conflict stages; tracked files deleted from disk under a
    /// directory add are staged as deletions. Returns the staged paths.
    ///
    /// # Errors
    /// [`GitError::Fs`] with `NotFound` when a single-file pathspec names
    /// nothing on disk or in the index.
    pub fn add(&self, rel: &str) -> Result<Vec<String>> {
        let mut index = self.load_index()?;
        let mut staged = Vec::new();

        let rel = rel.trim_end_matches('/');
        let abs = if rel == "." {
            self.root().to_owned()
        } else {
            self.work_path(rel)
        };

        if self.store().is_dir(&abs)? {
            let prefix = if rel == "." { String::new() } else { format!("{rel}/") };
            for file in self.store().walk_files(&abs, &CONTROL_PATHS)? {
                let Some(file_rel) = self.rel(&file) else {
                    continue;
                };
                let data = self.store().read_file(&file)?;
                let oid = self.write_blob(&data)?;
                index.set(&file_rel, oid);
                staged.push(file_rel);
            }
            // Tracked files that vanished under this prefix become staged
            // deletions.
            for tracked in index.paths() {
                if (prefix.is_empty() || tracked.starts_with(&prefix))
                    && !self.store().exists(&self.work_path(&tracked))?
                {
                    index.remove(&tracked);
                    staged.push(tracked);
                }
            }
        } else if self.store().exists(&abs)? {
            let data = self.store().read_file(&abs)?;
            let oid = self.write_blob(&data)?;
            index.set(rel, oid);
            staged.push(rel.to_owned());
        } else if index.get(rel, 0).is_some() || index.is_conflicted(rel) {
            // Deleted-but-tracked path: stage the deletion.
            index.remove(rel);
            staged.push(rel.to_owned());
        } else {
            return Err(edugit_fs::FsError::not_found(&abs).into());
        }

        self.save_index(&index)?;
        debug!(count = staged.len(), "staged paths");
        Ok(staged)
    }

    /// Remove `rel` from the index and, if still present, from the
    /// working tree.
    ///
    /// # Errors
    /// `NotFound` when the path is neither tracked nor on disk.
    pub fn remove_path(&self, rel: &str) -> Result<()> {
        let mut index = self.load_index()?;
        let abs = self.work_path(rel);
        let on_disk = self.store().exists(&abs)?;
        if index.get(rel, 0).is_none() && !index.is_conflicted(rel) && !on_disk {
            return Err(edugit_fs::FsError::not_found(&abs).into());
        }
        if on_disk {
            self.store().unlink(&abs)?;
            self.prune_empty_dirs(&abs);
        }
        index.remove(rel);
        self.save_index(&index)
    }

    /// Restore the stage-0 entry for `rel` from `HEAD`; clears the entry
    /// (all stages) when `HEAD` lacks the path.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn reset_index(&self, rel: &str) -> Result<()> {
        let head = self.flatten_commit(self.head_oid()?)?;
        let mut index = self.load_index()?;
        match head.get(rel) {
            Some(oid) => index.set(rel, *oid),
            None => index.remove(rel),
        }
        self.save_index(&index)
    }

    // -----------------------------------------------------------------------
    // checkout
    // -----------------------------------------------------------------------

    /// Three-mode checkout: switch `HEAD` to a branch, restore specific
    /// files from a ref, or detach onto a commit.
    ///
    /// # Errors
    /// [`GitError::DirtyWorkingTree`] when switching would overwrite
    /// local changes (unless `force`); [`GitError::InvalidRef`] for an
    /// unresolvable target or filepath.
    pub fn checkout(&self, opts: &CheckoutOpts) -> Result<()> {
        if let Some(filepaths) = &opts.filepaths {
            return self.checkout_paths(opts.target.as_deref(), filepaths);
        }
        let target = opts.target.as_deref().unwrap_or("HEAD");
        let target_oid = self.resolve_ref(target)?;
        let target_blobs = self.flatten_commit(Some(target_oid))?;

        if !opts.force {
            self.ensure_clean_for(&target_blobs)?;
        }

        self.reset_worktree_and_index(&target_blobs)?;

        if !opts.no_update_head {
            let is_branch = self
                .read_ref(&format!("refs/heads/{target}"))?
                .is_some();
            if is_branch {
                self.set_head_branch(target)?;
            } else {
                self.set_head_detached(target_oid)?;
            }
        }
        debug!(target, "checkout complete");
        Ok(())
    }

    fn checkout_paths(&self, source: Option<&str>, filepaths: &[String]) -> Result<()> {
        let source_oid = self.resolve_ref(source.unwrap_or("HEAD"))?;
        let blobs = self.flatten_commit(Some(source_oid))?;
        let mut index = self.load_index()?;
        for rel in filepaths {
            let rel = rel.trim_end_matches('/');
            let matched: Vec<(&String, &Oid)> = blobs
                .iter()
                .filter(|(p, _)| p.as_str() == rel || p.starts_with(&format!("{rel}/")))
                .collect();
            if matched.is_empty() {
                return Err(GitError::InvalidRef {
                    name: rel.to_owned(),
                });
            }
            for (p, oid) in matched {
                let data = self.read_blob(*oid)?;
                self.store().write_file_all(&self.work_path(p), &data)?;
                index.set(p, *oid);
            }
        }
        self.save_index(&index)
    }

    /// Abort with [`GitError::DirtyWorkingTree`] if uncommitted changes
    /// overlap paths that differ between `HEAD` and the target tree.
    fn ensure_clean_for(&self, target: &BTreeMap<String, Oid>) -> Result<()> {
        let head = self.flatten_commit(self.head_oid()?)?;
        let report = self.status_report()?;

        let mut overlapping: Vec<String> = report
            .dirty_paths()
            .into_iter()
            .filter(|p| head.get(p) != target.get(p))
            .collect();

        // Untracked files that the target would overwrite with different
        // content also count.
        for p in &report.untracked {
            if let Some(target_oid) = target.get(p) {
                let data = self.store().read_file(&self.work_path(p))?;
                if blob_id(&data) != *target_oid && !overlapping.contains(p) {
                    overlapping.push(p.clone());
                }
            }
        }

        if overlapping.is_empty() {
            Ok(())
        } else {
            overlapping.sort();
            Err(GitError::DirtyWorkingTree {
                files: overlapping,
            })
        }
    }

    // -----------------------------------------------------------------------
    // materialisation
    // -----------------------------------------------------------------------

    /// Rewrite the working tree and index to exactly `blobs`.
    ///
    /// Tracked paths absent from `blobs` are deleted (working-tree writes
    /// before index rewrite). Untracked files are left alone.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn reset_worktree_and_index(&self, blobs: &BTreeMap<String, Oid>) -> Result<()> {
        let index = self.load_index()?;
        let head = self.flatten_commit(self.head_oid()?)?;
        let mut tracked: BTreeSet<String> = head.keys().cloned().collect();
        tracked.extend(index.paths());

        for p in &tracked {
            if !blobs.contains_key(p) {
                let abs = self.work_path(p);
                if self.store().exists(&abs)? {
                    self.store().unlink(&abs)?;
                    self.prune_empty_dirs(&abs);
                }
            }
        }
        for (p, oid) in blobs {
            let data = self.read_blob(*oid)?;
            self.store().write_file_all(&self.work_path(p), &data)?;
        }

        let mut fresh = crate::index::Index::default();
        for (p, oid) in blobs {
            fresh.set(p, *oid);
        }
        self.save_index(&fresh)
    }

    /// Best-effort removal of newly empty parent directories after a
    /// file deletion. Stops at the repository root.
    pub(crate) fn prune_empty_dirs(&self, removed_abs: &str) {
        let mut cur = path::parent(removed_abs);
        while let Some(dir) = cur {
            if dir == self.root() || dir.len() < self.root().len() {
                break;
            }
            if self.store().rmdir(&dir).is_err() {
                break;
            }
            cur = path::parent(&dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::{FileStore, MemStore};

    use super::*;
    use crate::config::Identity;

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

    #[test]
    fn add_single_file_stages_blob() {
        let (s, repo) = setup();
        s.write_file("/hello.txt", b"hi").unwrap();
        let staged = repo.add("hello.txt").unwrap();
        assert_eq!(staged, vec!["hello.txt"]);
        let index = repo.load_index().unwrap();
        assert!(index.staged_oid("hello.txt").is_some());
    }

    #[test]
    fn add_dot_recurses_and_skips_control() {
        let (s, repo) = setup();
        s.write_file_all("/src/a.txt", b"a").unwrap();
        s.write_file_all("/.remotes/r/x", b"x").unwrap();
        let staged = repo.add(".").unwrap();
        assert_eq!(staged, vec!["src/a.txt"]);
    }

    #[test]
    fn add_missing_pathspec_fails() {
        let (_s, repo) = setup();
        assert!(repo.add("ghost.txt").is_err());
    }

    #[test]
    fn add_stages_deletion_of_tracked_file() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"v").unwrap();
        commit_all(&repo, "init");
        s.unlink("/f.txt").unwrap();
        repo.add("f.txt").unwrap();
        assert!(repo.load_index().unwrap().staged_oid("f.txt").is_none());
    }

    #[test]
    fn remove_path_deletes_and_unstages() {
        let (s, repo) = setup();
        s.write_file_all("/docs/a.txt", b"a").unwrap();
        commit_all(&repo, "init");
        repo.remove_path("docs/a.txt").unwrap();
        assert!(!s.exists("/docs/a.txt").unwrap());
        // Parent pruned once empty.
        assert!(!s.exists("/docs").unwrap());
        assert!(repo.load_index().unwrap().staged_oid("docs/a.txt").is_none());
    }

    #[test]
    fn reset_index_restores_head_entry() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"original").unwrap();
        commit_all(&repo, "init");
        s.write_file("/f.txt", b"edited").unwrap();
        repo.add("f.txt").unwrap();
        repo.reset_index("f.txt").unwrap();
        let report = repo.status_report().unwrap();
        assert!(report.staged_modified.is_empty());
        assert_eq!(report.unstaged_modified, vec!["f.txt"]);
    }

    #[test]
    fn checkout_switches_branch_and_tree() {
        let (s, repo) = setup();
        s.write_file("/base.txt", b"base").unwrap();
        let first = commit_all(&repo, "base");
        repo.write_ref("refs/heads/feature", first, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        s.write_file("/feature.txt", b"feat").unwrap();
        commit_all(&repo, "feature work");

        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
        assert!(!s.exists("/feature.txt").unwrap());

        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        assert!(s.exists("/feature.txt").unwrap());
    }

    #[test]
    fn checkout_dirty_overlap_aborts() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"main version").unwrap();
        commit_all(&repo, "main");
        repo.write_ref("refs/heads/other", repo.head_oid().unwrap().unwrap(), false)
            .unwrap();
        repo.checkout(&CheckoutOpts::branch("other")).unwrap();
        s.write_file("/f.txt", b"other version").unwrap();
        commit_all(&repo, "other");

        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        s.write_file("/f.txt", b"local edit").unwrap();
        let err = repo.checkout(&CheckoutOpts::branch("other")).unwrap_err();
        assert!(matches!(err, GitError::DirtyWorkingTree { .. }));

        // Force discards.
        repo.checkout(&CheckoutOpts::force("other")).unwrap();
        assert_eq!(s.read_file("/f.txt").unwrap(), b"other version");
    }

    #[test]
    fn checkout_dirty_non_overlapping_is_allowed() {
        let (s, repo) = setup();
        s.write_file("/shared.txt", b"same").unwrap();
        commit_all(&repo, "one");
        repo.write_ref("refs/heads/two", repo.head_oid().unwrap().unwrap(), false)
            .unwrap();
        // Local edit to a file identical in both trees survives the switch
        // check (it would not be overwritten).
        s.write_file("/unrelated.txt", b"scratch").unwrap();
        repo.checkout(&CheckoutOpts::branch("two")).unwrap();
        assert!(s.exists("/unrelated.txt").unwrap());
    }

    #[test]
    fn checkout_single_file_restores_content() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"committed").unwrap();
        commit_all(&repo, "init");
        s.write_file("/f.txt", b"scribbles").unwrap();
        repo.checkout(&CheckoutOpts {
            filepaths: Some(vec!["f.txt".to_owned()]),
            ..CheckoutOpts::default()
        })
        .unwrap();
        assert_eq!(s.read_file("/f.txt").unwrap(), b"committed");
    }

    #[test]
    fn checkout_detaches_on_oid() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"1").unwrap();
        let first = commit_all(&repo, "one");
        s.write_file("/f.txt", b"2").unwrap();
        commit_all(&repo, "two");

        repo.checkout(&CheckoutOpts::force(&first.to_hex())).unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
        assert_eq!(s.read_file("/f.txt").unwrap(), b"1");
    }
}
