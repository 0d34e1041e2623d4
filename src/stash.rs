//! A minimal ref-less stash stack.
//!
//! Each entry captures the working tree's divergence from `HEAD` —
//! tracked modifications, deletions, and untracked files — as full
//! snapshots on a JSON stack at `.git/stash`. Push restores the head
//! tree; pop writes the captured files back.

use serde::{Deserialize, Serialize};

use crate::error::{GitError, Result};
use crate::repo::Repository;

/// One captured file within a stash entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashFile {
    /// Repo-relative path.
    pub path: String,
    /// The captured content; `None` records a deletion relative to HEAD.
    pub content: Option<String>,
}

/// One stash entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashEntry {
    /// Display message (`WIP on <branch>` by default).
    pub message: String,
    /// The captured divergence.
    pub files: Vec<StashFile>,
}

impl Repository {
    fn load_stash(&self) -> Result<Vec<StashEntry>> {
        let p = self.git_path("stash");
        if !self.store().exists(&p)? {
            return Ok(Vec::new());
        }
        let raw = self.store().read_file(&p)?;
        serde_json::from_slice(&raw).map_err(|e| GitError::CorruptObject {
            oid: "stash".to_owned(),
            detail: e.to_string(),
        })
    }

    fn save_stash(&self, stack: &[StashEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(stack).map_err(|e| GitError::CorruptObject {
            oid: "stash".to_owned(),
            detail: e.to_string(),
        })?;
        self.store().write_file_all(&self.git_path("stash"), &json)?;
        Ok(())
    }

    /// Capture the current divergence from `HEAD` and reset the tree.
    ///
    /// Returns `None` when there is nothing to stash.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn stash_push(&self, message: Option<&str>) -> Result<Option<StashEntry>> {
        let head = self.head_oid()?;
        let head_blobs = self.flatten_commit(head)?;
        let report = self.status_report()?;

        let mut files = Vec::new();
        let mut touched: Vec<String> = report.dirty_paths();
        touched.extend(report.untracked.iter().cloned());
        touched.sort();
        touched.dedup();
        for path in touched {
            let abs = self.work_path(&path);
            let content = if self.store().exists(&abs)? {
                Some(String::from_utf8_lossy(&self.store().read_file(&abs)?).into_owned())
            } else {
                None
            };
            files.push(StashFile { path, content });
        }
        if files.is_empty() {
            return Ok(None);
        }

        let branch = report.branch.unwrap_or_else(|| "(detached)".to_owned());
        let entry = StashEntry {
            message: message.map_or_else(|| format!("WIP on {branch}"), str::to_owned),
            files,
        };
        let mut stack = self.load_stash()?;
        stack.insert(0, entry.clone());
        self.save_stash(&stack)?;

        // Back to the head tree; untracked captures are removed too.
        self.reset_worktree_and_index(&head_blobs)?;
        for file in &entry.files {
            if head_blobs.contains_key(&file.path) {
                continue;
            }
            let abs = self.work_path(&file.path);
            if self.store().exists(&abs)? {
                self.store().unlink(&abs)?;
                self.prune_empty_dirs(&abs);
            }
        }
        Ok(Some(entry))
    }

    /// Re-apply and drop the newest stash entry.
    ///
    /// # Errors
    /// [`GitError::NoOperationInProgress`] on an empty stack.
    pub fn stash_pop(&self) -> Result<StashEntry> {
        let mut stack = self.load_stash()?;
        if stack.is_empty() {
            return Err(GitError::NoOperationInProgress);
        }
        let entry = stack.remove(0);
        for file in &entry.files {
            let abs = self.work_path(&file.path);
            match &file.content {
                Some(text) => self.store().write_file_all(&abs, text.as_bytes())?,
                None => {
                    if self.store().exists(&abs)? {
                        self.store().unlink(&abs)?;
                        self.prune_empty_dirs(&abs);
                    }
                }
            }
        }
        self.save_stash(&stack)?;
        Ok(entry)
    }

    /// The stack, newest first.
    ///
    /// # Errors
    /// Filesystem failures and a corrupt stash file.
    pub fn stash_list(&self) -> Result<Vec<StashEntry>> {
        self.load_stash()
    }
}
