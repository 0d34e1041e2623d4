//! Commit creation from the index.
//!
//! A commit snapshots the stage-0 index entries as a tree, records the
//! parents (`HEAD`, plus `MERGE_HEAD` while a merge is being concluded),
//! and moves the current branch ref — or `HEAD` itself when detached.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::config::Identity;
use crate::error::{GitError, Result};
use crate::model::{Commit, Object, Oid, Signature};
use crate::refs::Head;
use crate::repo::Repository;

/// The result of a commit attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitResult {
    /// A commit was created and the ref moved.
    Created {
        /// The new commit.
        oid: Oid,
        /// The branch that moved, `None` when `HEAD` is detached.
        branch: Option<String>,
        /// Whether this concluded an in-progress merge.
        merge: bool,
    },
    /// The index matches `HEAD`; nothing was recorded.
    NothingToCommit,
}

impl CommitResult {
    /// The created oid, if a commit happened.
    #[must_use]
    pub const fn oid(&self) -> Option<Oid> {
        match self {
            Self::Created { oid, .. } => Some(*oid),
            Self::NothingToCommit => None,
        }
    }
}

/// Current unix time in seconds.
#[must_use]
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

impl Repository {
    /// Build and write the tree for the current stage-0 index entries.
    ///
    /// # Errors
    /// [`GitError::UnresolvedConflicts`] while stage 1/2/3 entries exist.
    pub fn write_index_tree(&self) -> Result<Oid> {
        let index = self.load_index()?;
        if index.has_conflicts() {
            return Err(GitError::UnresolvedConflicts {
                files: index.conflicted_paths(),
            });
        }
        let blobs = index
            .entries()
            .iter()
            .map(|e| (e.path.clone(), e.oid))
            .collect();
        self.build_tree(&blobs)
    }

    /// Write a commit object with explicit tree and parents, and advance
    /// the ref `HEAD` points at (or `HEAD` itself when detached).
    ///
    /// # Errors
    /// Filesystem failures.
    pub fn create_commit(
        &self,
        tree: Oid,
        parents: Vec<Oid>,
        message: &str,
        identity: &Identity,
    ) -> Result<Oid> {
        let sig = Signature {
            name: identity.name.clone(),
            email: identity.email.clone(),
            timestamp: now_secs(),
        };
        let commit = Commit {
            tree,
            parents,
            author: sig.clone(),
            committer: sig,
            message: message.to_owned(),
        };
        let oid = self.write_object(&Object::Commit(commit))?;
        match self.head()? {
            Head::Branch(branch) => {
                self.write_ref(&format!("refs/heads/{branch}"), oid, true)?;
            }
            Head::Detached(_) => self.set_head_detached(oid)?,
        }
        Ok(oid)
    }

    /// Commit the index.
    ///
    /// While `MERGE_HEAD` exists the commit gains it as a second parent
    /// and, when no message is given, consumes `MERGE_MSG`; both files
    /// are removed afterwards.
    ///
    /// # Errors
    /// [`GitError::UnresolvedConflicts`] while conflict stages remain.
    pub fn commit(&self, message: Option<&str>, identity: &Identity) -> Result<CommitResult> {
        let tree = self.write_index_tree()?;
        let head = self.head_oid()?;
        let merge_head = self.read_op_oid(crate::op::MERGE_HEAD)?;

        if merge_head.is_none() {
            if let Some(head_oid) = head {
                if self.read_commit(head_oid)?.tree == tree {
                    return Ok(CommitResult::NothingToCommit);
                }
            } else if self.load_index()?.entries().is_empty() {
                return Ok(CommitResult::NothingToCommit);
            }
        }

        let merge_msg = self.read_op_text(crate::op::MERGE_MSG)?;
        let message = message
            .map(str::to_owned)
            .or(merge_msg)
            .unwrap_or_default();

        let mut parents = Vec::new();
        if let Some(h) = head {
            parents.push(h);
        }
        if let Some(m) = merge_head {
            parents.push(m);
        }

        let oid = self.create_commit(tree, parents, &message, identity)?;
        self.clear_op_file(crate::op::MERGE_HEAD)?;
        self.clear_op_file(crate::op::MERGE_MSG)?;

        let branch = self.current_branch()?;
        info!(%oid, branch = branch.as_deref().unwrap_or("<detached>"), "created commit");
        Ok(CommitResult::Created {
            oid,
            branch,
            merge: merge_head.is_some(),
        })
    }
}
