//! The cherry-pick operation.
//!
//! Applies one commit's change onto the current head. On conflicts the
//! picked message is parked in `CHERRY_PICK_MSG` and the picked oid in
//! `CHERRY_PICK_HEAD` (written last); `--continue` commits the parked
//! message once the index is conflict-free, `--abort` restores the head
//! tree.

use tracing::info;

use crate::config::Identity;
use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::op::{CHERRY_PICK_HEAD, CHERRY_PICK_MSG};
use crate::repo::Repository;

/// The result of a cherry-pick attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CherryPickOutcome {
    /// The pick applied and was committed.
    Applied {
        /// The new commit on the current branch.
        oid: Oid,
    },
    /// Conflicts were materialised; the pick is now in progress.
    Conflict {
        /// Conflicted paths, sorted.
        files: Vec<String>,
    },
}

impl Repository {
    /// Cherry-pick `target_ref` onto the current head.
    ///
    /// # Errors
    /// [`GitError::OperationInProgress`], [`GitError::DirtyWorkingTree`]
    /// on the pre-checks; [`GitError::InvalidRef`] for an unborn head or
    /// unresolvable ref.
    pub fn cherry_pick(&self, target_ref: &str, identity: &Identity) -> Result<CherryPickOutcome> {
        self.ensure_no_operation()?;
        self.ensure_clean_worktree()?;
        let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        let target = self.resolve_commitish(target_ref)?;

        let result = self.apply_commit_changes(target, head, "HEAD", &target.short())?;
        if result.is_clean() {
            let tree = self.write_index_tree()?;
            let oid = self.create_commit(tree, vec![head], &result.commit_message, identity)?;
            info!(%oid, picked = %target.short(), "cherry-pick applied");
            return Ok(CherryPickOutcome::Applied { oid });
        }

        let mut files = result.conflict_files;
        files.sort();
        // Message first, the authoritative HEAD file last.
        self.write_op_file(CHERRY_PICK_MSG, &result.commit_message)?;
        self.write_op_file(CHERRY_PICK_HEAD, &format!("{target}\n"))?;
        info!(picked = %target.short(), "cherry-pick stopped on conflicts");
        Ok(CherryPickOutcome::Conflict { files })
    }

    /// Conclude a conflicted cherry-pick after resolution.
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] without pick state;
    /// [`GitError::UnresolvedConflicts`] while stages 1/2/3 remain.
    pub fn cherry_pick_continue(&self, identity: &Identity) -> Result<CherryPickOutcome> {
        if self.read_op_oid(CHERRY_PICK_HEAD)?.is_none() {
            return Err(GitError::NoOperationInProgress);
        }
        let message = self.read_op_text(CHERRY_PICK_MSG)?.unwrap_or_default();
        let tree = self.write_index_tree()?;
        let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        let oid = self.create_commit(tree, vec![head], &message, identity)?;
        self.clear_op_file(CHERRY_PICK_MSG)?;
        self.clear_op_file(CHERRY_PICK_HEAD)?;
        info!(%oid, "cherry-pick concluded");
        Ok(CherryPickOutcome::Applied { oid })
    }

    /// Abort a conflicted cherry-pick, restoring the head tree.
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] without pick state.
    pub fn cherry_pick_abort(&self) -> Result<()> {
        if self.read_op_oid(CHERRY_PICK_HEAD)?.is_none() {
            return Err(GitError::NoOperationInProgress);
        }
        let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        self.reset_worktree_and_index(&self.flatten_commit(Some(head))?)?;
        self.clear_op_file(CHERRY_PICK_MSG)?;
        self.clear_op_file(CHERRY_PICK_HEAD)?;
        Ok(())
    }
}
