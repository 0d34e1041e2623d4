//! The rebase operation.
//!
//! A rebase resets the current branch onto the upstream and replays the
//! branch's own commits oldest-first through
//! [`Repository::apply_commit_changes`]. The todo list, cursor, and
//! conflict state persist as files under the git directory so the loop
//! can stop on conflicts (or cancellation) and resume with
//! `--continue`.

use tracing::info;

use crate::cancel::CancelFlag;
use crate::config::Identity;
use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::op::{
    REBASE_CONFLICTS, REBASE_CURRENT, REBASE_HEAD, REBASE_INDEX, REBASE_ORIG_HEAD, REBASE_TODO,
};
use crate::refs::Head;
use crate::repo::Repository;

/// The result of a rebase step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The head already descends from the upstream.
    UpToDate,
    /// Every todo commit was replayed and the state files are gone.
    Complete {
        /// How many commits were replayed.
        count: usize,
    },
    /// The loop stopped on conflicts; resolve and `--continue`.
    Stopped {
        /// The commit whose replay conflicted.
        oid: Oid,
        /// Conflicted paths, sorted.
        files: Vec<String>,
    },
    /// Cancellation was requested between steps; state files remain.
    Cancelled,
}

fn corrupt(name: &str, detail: impl Into<String>) -> GitError {
    GitError::CorruptObject {
        oid: name.to_owned(),
        detail: detail.into(),
    }
}

impl Repository {
    /// Rebase the current branch onto `upstream_ref`.
    ///
    /// # Errors
    /// [`GitError::OperationInProgress`], [`GitError::DirtyWorkingTree`]
    /// on the pre-checks; [`GitError::InvalidRef`] for an unborn head or
    /// unresolvable upstream.
    pub fn rebase(
        &self,
        upstream_ref: &str,
        identity: &Identity,
        cancel: &CancelFlag,
    ) -> Result<RebaseOutcome> {
        self.ensure_no_operation()?;
        self.ensure_clean_worktree()?;
        let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        let upstream = self.resolve_commitish(upstream_ref)?;

        if self.is_descendent(head, upstream)? {
            return Ok(RebaseOutcome::UpToDate);
        }

        // Commits to replay: ours minus upstream's history, oldest first.
        let upstream_history: std::collections::BTreeSet<Oid> =
            self.log(upstream)?.into_iter().map(|e| e.oid).collect();
        let mut todo: Vec<Oid> = self
            .log(head)?
            .into_iter()
            .map(|e| e.oid)
            .filter(|oid| !upstream_history.contains(oid))
            .collect();
        todo.reverse();

        self.write_op_file(REBASE_HEAD, &format!("{upstream}\n"))?;
        self.write_op_file(REBASE_ORIG_HEAD, &format!("{head}\n"))?;
        self.save_rebase_todo(&todo)?;
        self.write_op_file(REBASE_INDEX, "0")?;

        // Reset the branch onto the upstream and start replaying.
        match self.head()? {
            Head::Branch(branch) => {
                self.write_ref(&format!("refs/heads/{branch}"), upstream, true)?;
            }
            Head::Detached(_) => self.set_head_detached(upstream)?,
        }
        self.reset_worktree_and_index(&self.flatten_commit(Some(upstream))?)?;
        info!(count = todo.len(), upstream = %upstream.short(), "rebase started");

        self.run_rebase_loop(identity, cancel)
    }

    /// Resume after conflict resolution (or cancellation).
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] without rebase state;
    /// [`GitError::UnresolvedConflicts`] while conflicted paths remain
    /// staged at 1/2/3.
    pub fn rebase_continue(
        &self,
        identity: &Identity,
        cancel: &CancelFlag,
    ) -> Result<RebaseOutcome> {
        if self.read_op_oid(REBASE_HEAD)?.is_none() {
            return Err(GitError::NoOperationInProgress);
        }

        let index = self.load_index()?;
        let pending = self.load_rebase_conflicts()?;
        let unresolved: Vec<String> = pending
            .into_iter()
            .filter(|p| index.is_conflicted(p))
            .collect();
        if !unresolved.is_empty() {
            return Err(GitError::UnresolvedConflicts { files: unresolved });
        }

        if let Some(current) = self.read_op_oid(REBASE_CURRENT)? {
            // Commit the held step with its original message.
            let message = self.read_commit(current)?.message;
            let tree = self.write_index_tree()?;
            let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
                name: "HEAD".to_owned(),
            })?;
            self.create_commit(tree, vec![head], &message, identity)?;
            self.clear_op_file(REBASE_CURRENT)?;
            self.clear_op_file(REBASE_CONFLICTS)?;
            let cursor = self.load_rebase_cursor()?;
            self.write_op_file(REBASE_INDEX, &(cursor + 1).to_string())?;
        }

        self.run_rebase_loop(identity, cancel)
    }

    /// Abort the rebase, restoring the original branch tip.
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] without rebase state.
    pub fn rebase_abort(&self) -> Result<()> {
        if self.read_op_oid(REBASE_HEAD)?.is_none() {
            return Err(GitError::NoOperationInProgress);
        }
        let orig = self
            .read_op_oid(REBASE_ORIG_HEAD)?
            .ok_or_else(|| corrupt(REBASE_ORIG_HEAD, "missing"))?;
        match self.head()? {
            Head::Branch(branch) => {
                self.write_ref(&format!("refs/heads/{branch}"), orig, true)?;
            }
            Head::Detached(_) => self.set_head_detached(orig)?,
        }
        self.reset_worktree_and_index(&self.flatten_commit(Some(orig))?)?;
        self.clear_rebase_files()?;
        Ok(())
    }

    /// Replay todo commits from the cursor until done, conflicted, or
    /// cancelled.
    fn run_rebase_loop(
        &self,
        identity: &Identity,
        cancel: &CancelFlag,
    ) -> Result<RebaseOutcome> {
        let todo = self.load_rebase_todo()?;
        let mut cursor = self.load_rebase_cursor()?;

        while cursor < todo.len() {
            if cancel.is_cancelled() {
                self.write_op_file(REBASE_INDEX, &cursor.to_string())?;
                info!(cursor, "rebase cancelled between steps");
                return Ok(RebaseOutcome::Cancelled);
            }
            let target = todo[cursor];
            let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
                name: "HEAD".to_owned(),
            })?;
            let result =
                self.apply_commit_changes(target, head, "HEAD", &target.short())?;
            if !result.is_clean() {
                let mut files = result.conflict_files;
                files.sort();
                self.write_op_file(REBASE_CURRENT, &format!("{target}\n"))?;
                self.write_op_file(REBASE_CONFLICTS, &serde_json::to_string(&files)
                    .map_err(|e| corrupt(REBASE_CONFLICTS, e.to_string()))?)?;
                self.write_op_file(REBASE_INDEX, &cursor.to_string())?;
                info!(target = %target.short(), "rebase stopped on conflicts");
                return Ok(RebaseOutcome::Stopped { oid: target, files });
            }
            let tree = self.write_index_tree()?;
            self.create_commit(tree, vec![head], &result.commit_message, identity)?;
            cursor += 1;
            self.write_op_file(REBASE_INDEX, &cursor.to_string())?;
        }

        self.clear_rebase_files()?;
        info!(count = todo.len(), "rebase complete");
        Ok(RebaseOutcome::Complete { count: todo.len() })
    }

    fn clear_rebase_files(&self) -> Result<()> {
        for name in [
            REBASE_TODO,
            REBASE_INDEX,
            REBASE_CURRENT,
            REBASE_CONFLICTS,
            REBASE_ORIG_HEAD,
            REBASE_HEAD,
        ] {
            self.clear_op_file(name)?;
        }
        Ok(())
    }

    fn save_rebase_todo(&self, todo: &[Oid]) -> Result<()> {
        let json = serde_json::to_string(todo).map_err(|e| corrupt(REBASE_TODO, e.to_string()))?;
        self.write_op_file(REBASE_TODO, &json)
    }

    fn load_rebase_todo(&self) -> Result<Vec<Oid>> {
        let text = self
            .read_op_text(REBASE_TODO)?
            .ok_or_else(|| corrupt(REBASE_TODO, "missing"))?;
        serde_json::from_str(&text).map_err(|e| corrupt(REBASE_TODO, e.to_string()))
    }

    fn load_rebase_cursor(&self) -> Result<usize> {
        let text = self
            .read_op_text(REBASE_INDEX)?
            .ok_or_else(|| corrupt(REBASE_INDEX, "missing"))?;
        text.trim()
            .parse()
            .map_err(|_| corrupt(REBASE_INDEX, format!("bad cursor {text:?}")))
    }

    fn load_rebase_conflicts(&self) -> Result<Vec<String>> {
        match self.read_op_text(REBASE_CONFLICTS)? {
            None => Ok(Vec::new()),
            Some(text) => {
                serde_json::from_str(&text).map_err(|e| corrupt(REBASE_CONFLICTS, e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::{FileStore, MemStore};

    use super::*;
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

    /// main gains one commit after `feature` branched with two commits
    /// of its own (disjoint files, so the replay is clean).
    fn fixture(s: &Arc<dyn FileStore>, repo: &Repository) -> (Oid, Oid) {
        s.write_file("/base.txt", b"base\n").unwrap();
        let base = commit_all(repo, "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();

        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        s.write_file("/feat1.txt", b"1\n").unwrap();
        commit_all(repo, "feat one");
        s.write_file("/feat2.txt", b"2\n").unwrap();
        commit_all(repo, "feat two");

        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        s.write_file("/main.txt", b"m\n").unwrap();
        let upstream = commit_all(repo, "main work");

        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        (base, upstream)
    }

    #[test]
    fn rebase_replays_oldest_first_with_fresh_oids() {
        let (s, repo) = setup();
        let (_base, upstream) = fixture(&s, &repo);
        let before: Vec<Oid> = repo
            .log(repo.head_oid().unwrap().unwrap())
            .unwrap()
            .iter()
            .map(|e| e.oid)
            .collect();

        let outcome = repo
            .rebase("main", &Identity::default(), &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome, RebaseOutcome::Complete { count: 2 });
        assert_eq!(repo.operation_in_progress().unwrap(), None);

        let log = repo.log(repo.head_oid().unwrap().unwrap()).unwrap();
        let messages: Vec<&str> = log.iter().map(|e| e.commit.summary()).collect();
        assert_eq!(messages, vec!["feat two", "feat one", "main work", "base"]);
        // The upstream commit is in the history now.
        assert!(log.iter().any(|e| e.oid == upstream));
        // Replayed commits are new objects.
        for entry in &log[..2] {
            assert!(!before.contains(&entry.oid), "oid {} reused", entry.oid);
        }
        // Both trees materialised.
        assert!(s.exists("/feat1.txt").unwrap());
        assert!(s.exists("/feat2.txt").unwrap());
        assert!(s.exists("/main.txt").unwrap());
    }

    #[test]
    fn rebase_of_descendant_is_up_to_date() {
        let (s, repo) = setup();
        s.write_file("/a.txt", b"1\n").unwrap();
        let first = commit_all(&repo, "one");
        s.write_file("/a.txt", b"2\n").unwrap();
        commit_all(&repo, "two");
        repo.write_ref("refs/heads/old", first, false).unwrap();
        let outcome = repo
            .rebase("old", &Identity::default(), &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome, RebaseOutcome::UpToDate);
    }

    #[test]
    fn conflicted_rebase_stops_and_continues() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"base\n").unwrap();
        let base = commit_all(&repo, "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();

        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        s.write_file("/f.txt", b"feature version\n").unwrap();
        commit_all(&repo, "feature edit");

        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        s.write_file("/f.txt", b"main version\n").unwrap();
        commit_all(&repo, "main edit");

        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        let outcome = repo
            .rebase("main", &Identity::default(), &CancelFlag::new())
            .unwrap();
        let RebaseOutcome::Stopped { files, .. } = outcome else {
            panic!("expected stop, got {outcome:?}");
        };
        assert_eq!(files, vec!["f.txt"]);
        let text = String::from_utf8(s.read_file("/f.txt").unwrap()).unwrap();
        assert!(text.contains("<<<<<<<"));

        // Continue before resolving fails.
        let err = repo
            .rebase_continue(&Identity::default(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, GitError::UnresolvedConflicts { .. }));

        // Resolve, stage, continue.
        s.write_file("/f.txt", b"resolved\n").unwrap();
        repo.add(".").unwrap();
        let outcome = repo
            .rebase_continue(&Identity::default(), &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome, RebaseOutcome::Complete { count: 1 });
        assert_eq!(repo.operation_in_progress().unwrap(), None);

        let log = repo.log(repo.head_oid().unwrap().unwrap()).unwrap();
        let messages: Vec<&str> = log.iter().map(|e| e.commit.summary()).collect();
        assert_eq!(messages, vec!["feature edit", "main edit", "base"]);
        assert_eq!(s.read_file("/f.txt").unwrap(), b"resolved\n");
    }

    #[test]
    fn rebase_abort_restores_original_tip() {
        let (s, repo) = setup();
        s.write_file("/f.txt", b"base\n").unwrap();
        let base = commit_all(&repo, "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        s.write_file("/f.txt", b"feature\n").unwrap();
        let orig = commit_all(&repo, "feature edit");
        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        s.write_file("/f.txt", b"main\n").unwrap();
        commit_all(&repo, "main edit");
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();

        let outcome = repo
            .rebase("main", &Identity::default(), &CancelFlag::new())
            .unwrap();
        assert!(matches!(outcome, RebaseOutcome::Stopped { .. }));

        repo.rebase_abort().unwrap();
        assert_eq!(repo.read_ref("refs/heads/feature").unwrap(), Some(orig));
        assert_eq!(s.read_file("/f.txt").unwrap(), b"feature\n");
        assert_eq!(repo.operation_in_progress().unwrap(), None);
        assert!(matches!(
            repo.rebase_abort().unwrap_err(),
            GitError::NoOperationInProgress
        ));
    }

    #[test]
    fn cancelled_rebase_leaves_resume_state() {
        let (s, repo) = setup();
        let (_base, _upstream) = fixture(&s, &repo);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let outcome = repo
            .rebase("main", &Identity::default(), &cancel)
            .unwrap();
        assert_eq!(outcome, RebaseOutcome::Cancelled);
        assert_eq!(
            repo.operation_in_progress().unwrap(),
            Some(crate::op::OpKind::Rebase)
        );
        // Resume completes the remaining steps.
        let outcome = repo
            .rebase_continue(&Identity::default(), &CancelFlag::new())
            .unwrap();
        assert_eq!(outcome, RebaseOutcome::Complete { count: 2 });
    }

    #[test]
    fn dirty_tree_blocks_rebase() {
        let (s, repo) = setup();
        let (_base, _upstream) = fixture(&s, &repo);
        s.write_file("/base.txt", b"scribble\n").unwrap();
        repo.add("base.txt").unwrap();
        let err = repo
            .rebase("main", &Identity::default(), &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, GitError::DirtyWorkingTree { .. }));
    }
}
