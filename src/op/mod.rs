//! Multi-step operations: merge, rebase, cherry-pick.
//!
//! Each operation's durable state is a set of files under the git
//! directory; the presence of the primary `*_HEAD` file is authoritative
//! for "an operation is in progress". At most one operation runs at a
//! time. Operation files are written *after* the conflicting
//! working-tree files have been materialised, so an observer reading
//! `MERGE_HEAD` is guaranteed to see the conflict markers already in
//! place; deletions of operation files happen last.

pub mod apply;
pub mod cherry_pick;
pub mod merge;
pub mod rebase;

pub use apply::ApplyResult;
pub use cherry_pick::CherryPickOutcome;
pub use merge::{MergeAnalysis, MergeOutcome};
pub use rebase::RebaseOutcome;

use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::repo::Repository;

/// Merge-in-progress: the commit being merged.
pub const MERGE_HEAD: &str = "MERGE_HEAD";
/// Merge-in-progress: the prepared commit message.
pub const MERGE_MSG: &str = "MERGE_MSG";
/// Rebase: the upstream the branch is replayed onto.
pub const REBASE_HEAD: &str = "REBASE_HEAD";
/// Rebase: the branch tip before the rebase started.
pub const REBASE_ORIG_HEAD: &str = "REBASE_ORIG_HEAD";
/// Rebase: JSON list of commit oids still to replay (oldest first).
pub const REBASE_TODO: &str = "REBASE_TODO";
/// Rebase: cursor into the todo list.
pub const REBASE_INDEX: &str = "REBASE_INDEX";
/// Rebase: the commit whose replay stopped on conflicts.
pub const REBASE_CURRENT: &str = "REBASE_CURRENT";
/// Rebase: JSON list of conflicted paths.
pub const REBASE_CONFLICTS: &str = "REBASE_CONFLICTS";
/// Cherry-pick-in-progress: the commit being picked.
pub const CHERRY_PICK_HEAD: &str = "CHERRY_PICK_HEAD";
/// Cherry-pick-in-progress: the message to commit with.
pub const CHERRY_PICK_MSG: &str = "CHERRY_PICK_MSG";

/// Which multi-step operation is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// A merge stopped on conflicts.
    Merge,
    /// A rebase stopped on conflicts (or was cancelled mid-loop).
    Rebase,
    /// A cherry-pick stopped on conflicts.
    CherryPick,
}

impl OpKind {
    /// Lowercase operation name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::CherryPick => "cherry-pick",
        }
    }
}

impl Repository {
    /// Read an operation file as text, `None` if absent.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn read_op_text(&self, name: &str) -> Result<Option<String>> {
        let p = self.git_path(name);
        if !self.store().exists(&p)? {
            return Ok(None);
        }
        let raw = self.store().read_file(&p)?;
        Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Read an operation file holding a single oid, `None` if absent.
    ///
    /// # Errors
    /// [`GitError::CorruptObject`] on malformed contents.
    pub fn read_op_oid(&self, name: &str) -> Result<Option<Oid>> {
        match self.read_op_text(name)? {
            None => Ok(None),
            Some(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| GitError::CorruptObject {
                    oid: text.trim().to_owned(),
                    detail: format!("malformed {name}"),
                }),
        }
    }

    /// Write an operation file.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn write_op_file(&self, name: &str, contents: &str) -> Result<()> {
        self.store()
            .write_file_all(&self.git_path(name), contents.as_bytes())?;
        Ok(())
    }

    /// Remove an operation file if present.
    ///
    /// # Errors
    /// Filesystem failures other than absence.
    pub fn clear_op_file(&self, name: &str) -> Result<()> {
        let p = self.git_path(name);
        if self.store().exists(&p)? {
            self.store().unlink(&p)?;
        }
        Ok(())
    }

    /// The operation currently in progress, by primary `*_HEAD` file.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn operation_in_progress(&self) -> Result<Option<OpKind>> {
        if self.store().exists(&self.git_path(MERGE_HEAD))? {
            return Ok(Some(OpKind::Merge));
        }
        if self.store().exists(&self.git_path(REBASE_HEAD))? {
            return Ok(Some(OpKind::Rebase));
        }
        if self.store().exists(&self.git_path(CHERRY_PICK_HEAD))? {
            return Ok(Some(OpKind::CherryPick));
        }
        Ok(None)
    }

    /// Fail with [`GitError::OperationInProgress`] unless the repository
    /// is quiescent.
    ///
    /// # Errors
    /// As described.
    pub fn ensure_no_operation(&self) -> Result<()> {
        match self.operation_in_progress()? {
            None => Ok(()),
            Some(kind) => Err(GitError::OperationInProgress {
                operation: kind.as_str(),
            }),
        }
    }

    /// Fail with [`GitError::DirtyWorkingTree`] unless the working tree
    /// and index are clean (pre-check for rebase and cherry-pick).
    ///
    /// # Errors
    /// As described.
    pub fn ensure_clean_worktree(&self) -> Result<()> {
        let report = self.status_report()?;
        let dirty = report.dirty_paths();
        if dirty.is_empty() {
            Ok(())
        } else {
            Err(GitError::DirtyWorkingTree { files: dirty })
        }
    }
}
