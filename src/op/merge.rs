//! The merge operation.
//!
//! Case split on the relation between the heads: already merged,
//! fast-forward, or a real three-way merge against the merge base. A
//! conflicted merge materialises the marked files, records stages
//! 1/2/3, and only then writes `MERGE_MSG` and `MERGE_HEAD` — the
//! conflict is an Ok outcome, not an error.

use std::collections::BTreeSet;

use tracing::info;

use crate::config::Identity;
use crate::diff::merge_text;
use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::op::{MERGE_HEAD, MERGE_MSG};
use crate::refs::Head;
use crate::repo::Repository;
use crate::worktree::CheckoutOpts;

/// The result of a merge attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// `theirs` is already reachable from the current head.
    AlreadyUpToDate,
    /// The branch ref moved forward without a new commit.
    FastForward {
        /// The new tip.
        to: Oid,
    },
    /// A merge commit was created.
    Merged {
        /// The merge commit.
        oid: Oid,
    },
    /// Conflicts were materialised; the merge is now in progress.
    Conflict {
        /// Conflicted paths, sorted.
        files: Vec<String>,
    },
}

/// A dry-run merge classification (no writes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeAnalysis {
    /// `true` when the merge would complete without conflicts.
    pub clean: bool,
    /// The paths that would conflict, sorted.
    pub conflict_files: Vec<String>,
}

impl Repository {
    /// Merge `theirs_ref` into the current head.
    ///
    /// # Errors
    /// [`GitError::OperationInProgress`] if another operation holds the
    /// repository; [`GitError::InvalidRef`] on an unborn head or an
    /// unresolvable ref; [`GitError::DirtyWorkingTree`] when local
    /// changes overlap the incoming tree.
    pub fn merge(&self, theirs_ref: &str, identity: &Identity) -> Result<MergeOutcome> {
        self.ensure_no_operation()?;
        let ours = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        let theirs = self.resolve_commitish(theirs_ref)?;

        if ours == theirs || self.is_descendent(ours, theirs)? {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        if self.is_descendent(theirs, ours)? {
            // Fast-forward: rewrite tree and index (with the usual
            // overlap protection), then move the ref.
            self.checkout(&CheckoutOpts {
                target: Some(theirs.to_hex()),
                no_update_head: true,
                ..CheckoutOpts::default()
            })?;
            match self.head()? {
                Head::Branch(branch) => {
                    self.write_ref(&format!("refs/heads/{branch}"), theirs, true)?;
                }
                Head::Detached(_) => self.set_head_detached(theirs)?,
            }
            info!(to = %theirs.short(), "fast-forward merge");
            return Ok(MergeOutcome::FastForward { to: theirs });
        }

        self.ensure_clean_worktree()?;
        let base = self.merge_base(ours, theirs)?;
        let outcome = self.merge_trees(base, ours, theirs, theirs_ref, identity)?;
        Ok(outcome)
    }

    /// The real three-way merge, writing the working tree and index.
    fn merge_trees(
        &self,
        base: Option<Oid>,
        ours: Oid,
        theirs: Oid,
        theirs_ref: &str,
        identity: &Identity,
    ) -> Result<MergeOutcome> {
        let base_blobs = self.flatten_commit(base)?;
        let our_blobs = self.flatten_commit(Some(ours))?;
        let their_blobs = self.flatten_commit(Some(theirs))?;

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(base_blobs.keys());
        paths.extend(our_blobs.keys());
        paths.extend(their_blobs.keys());

        let mut index = self.load_index()?;
        let mut conflicts = Vec::new();

        for path in paths {
            let b = base_blobs.get(path).copied();
            let o = our_blobs.get(path).copied();
            let t = their_blobs.get(path).copied();

            if o == t || b == t {
                continue; // ours already has the right content
            }
            let abs = self.work_path(path);
            if b == o {
                // Only theirs changed: take it verbatim.
                match t {
                    Some(their_oid) => {
                        let data = self.read_blob(their_oid)?;
                        self.store().write_file_all(&abs, &data)?;
                        index.set(path, their_oid);
                    }
                    None => {
                        if self.store().exists(&abs)? {
                            self.store().unlink(&abs)?;
                            self.prune_empty_dirs(&abs);
                        }
                        index.remove(path);
                    }
                }
                continue;
            }

            // Both sides changed: merge content (absent sides merge as
            // empty text, which surfaces delete/edit conflicts).
            let merged = merge_text(
                &self.blob_text(b)?,
                &self.blob_text(o)?,
                &self.blob_text(t)?,
                "HEAD",
                theirs_ref,
            );
            self.store().write_file_all(&abs, merged.text.as_bytes())?;
            if merged.clean {
                let oid = self.write_blob(merged.text.as_bytes())?;
                index.set(path, oid);
            } else {
                index.set_conflict(path, b, o, t);
                conflicts.push(path.clone());
            }
        }

        self.save_index(&index)?;
        let message = format!("Merge branch '{theirs_ref}'");

        if conflicts.is_empty() {
            let tree = self.write_index_tree()?;
            let oid = self.create_commit(tree, vec![ours, theirs], &message, identity)?;
            info!(%oid, "merge commit created");
            return Ok(MergeOutcome::Merged { oid });
        }

        // Operation files go last so an observer that sees MERGE_HEAD
        // also sees the conflict markers on disk.
        conflicts.sort();
        self.write_op_file(MERGE_MSG, &message)?;
        self.write_op_file(MERGE_HEAD, &format!("{theirs}\n"))?;
        info!(count = conflicts.len(), "merge stopped on conflicts");
        Ok(MergeOutcome::Conflict { files: conflicts })
    }

    /// Abort an in-progress merge: restore the head tree and remove the
    /// operation files.
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] unless `MERGE_HEAD` exists.
    pub fn merge_abort(&self) -> Result<()> {
        if self.read_op_oid(MERGE_HEAD)?.is_none() {
            return Err(GitError::NoOperationInProgress);
        }
        let head = self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        let blobs = self.flatten_commit(Some(head))?;
        self.reset_worktree_and_index(&blobs)?;
        self.clear_op_file(MERGE_MSG)?;
        self.clear_op_file(MERGE_HEAD)?;
        Ok(())
    }

    /// Classify a merge of `theirs` into `ours` without writing
    /// anything. Used by pull previews and merge-request status.
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn merge_analysis(&self, ours: Oid, theirs: Oid) -> Result<MergeAnalysis> {
        if ours == theirs
            || self.is_descendent(ours, theirs)?
            || self.is_descendent(theirs, ours)?
        {
            return Ok(MergeAnalysis {
                clean: true,
                conflict_files: Vec::new(),
            });
        }
        let base = self.merge_base(ours, theirs)?;
        let base_blobs = self.flatten_commit(base)?;
        let our_blobs = self.flatten_commit(Some(ours))?;
        let their_blobs = self.flatten_commit(Some(theirs))?;

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(base_blobs.keys());
        paths.extend(our_blobs.keys());
        paths.extend(their_blobs.keys());

        let mut conflict_files = Vec::new();
        for path in paths {
            let b = base_blobs.get(path).copied();
            let o = our_blobs.get(path).copied();
            let t = their_blobs.get(path).copied();
            if o == t || b == t || b == o {
                continue;
            }
            let merged = merge_text(
                &self.blob_text(b)?,
                &self.blob_text(o)?,
                &self.blob_text(t)?,
                "ours",
                "theirs",
            );
            if !merged.clean {
                conflict_files.push(path.clone());
            }
        }
        conflict_files.sort();
        Ok(MergeAnalysis {
            clean: conflict_files.is_empty(),
            conflict_files,
        })
    }
}
