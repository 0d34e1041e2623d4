//! The three-way status matrix (HEAD × INDEX × WORKDIR).
//!
//! For each path the matrix carries a triple of small states:
//!
//! | slot    | 0      | 1                      | 2                     | 3        |
//! |---------|--------|------------------------|-----------------------|----------|
//! | head    | absent | present                | —                     | —        |
//! | index   | absent | identical to HEAD blob | present-but-different | conflict |
//! | workdir | absent | identical to HEAD blob | present-but-different | —        |
//!
//! Paths are the union of HEAD, the index, and the working tree, minus
//! the control paths (`.git`, `.remotes`, `.edu_git_remote.json`).

use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{Object, Oid};
use crate::repo::Repository;

/// Slot value: absent.
pub const ABSENT: u8 = 0;
/// Slot value: identical to the HEAD blob.
pub const UNMODIFIED: u8 = 1;
/// Slot value: present but different from the HEAD blob.
pub const MODIFIED: u8 = 2;
/// Slot value: unresolved conflict (index slot only).
pub const CONFLICTED: u8 = 3;

// ---------------------------------------------------------------------------
// StatusRow / StatusReport
// ---------------------------------------------------------------------------

/// One row of the status matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRow {
    /// Repo-relative path.
    pub path: String,
    /// HEAD slot.
    pub head: u8,
    /// Index slot.
    pub index: u8,
    /// Workdir slot.
    pub workdir: u8,
}

/// The categorised status used by `git status` rendering and the
/// dirty-tree checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Current branch, `None` when detached.
    pub branch: Option<String>,
    /// Paths staged as new files.
    pub staged_new: Vec<String>,
    /// Paths staged with modified content.
    pub staged_modified: Vec<String>,
    /// Paths staged for deletion.
    pub staged_deleted: Vec<String>,
    /// Tracked paths modified in the working tree but not staged.
    pub unstaged_modified: Vec<String>,
    /// Tracked paths deleted from the working tree but not staged.
    pub unstaged_deleted: Vec<String>,
    /// Paths present only in the working tree.
    pub untracked: Vec<String>,
    /// Paths with unresolved conflict stages.
    pub conflicted: Vec<String>,
}

impl StatusReport {
    /// Returns `true` when there is nothing to commit.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.staged_new.is_empty()
            && self.staged_modified.is_empty()
            && self.staged_deleted.is_empty()
            && self.unstaged_modified.is_empty()
            && self.unstaged_deleted.is_empty()
            && self.untracked.is_empty()
            && self.conflicted.is_empty()
    }

    /// Paths carrying any uncommitted change (staged or not), sorted.
    #[must_use]
    pub fn dirty_paths(&self) -> Vec<String> {
        let mut set: BTreeSet<String> = BTreeSet::new();
        for list in [
            &self.staged_new,
            &self.staged_modified,
            &self.staged_deleted,
            &self.unstaged_modified,
            &self.unstaged_deleted,
            &self.conflicted,
        ] {
            set.extend(list.iter().cloned());
        }
        set.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Hash bytes the way the object store would, without writing.
#[must_use]
pub fn blob_id(data: &[u8]) -> Oid {
    Object::Blob(data.to_vec()).id()
}

impl Repository {
    /// Compute the full status matrix, sorted by path.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn status_matrix(&self) -> Result<Vec<StatusRow>> {
        let head = self.flatten_commit(self.head_oid()?)?;
        let index = self.load_index()?;
        let worktree = self.worktree_files()?;

        let mut paths: BTreeSet<String> = BTreeSet::new();
        paths.extend(head.keys().cloned());
        paths.extend(index.paths());
        paths.extend(worktree.iter().cloned());

        let mut rows = Vec::with_capacity(paths.len());
        for path in paths {
            let head_oid = head.get(&path).copied();
            let head_slot = if head_oid.is_some() { UNMODIFIED } else { ABSENT };

            let index_slot = if index.is_conflicted(&path) {
                CONFLICTED
            } else {
                match index.staged_oid(&path) {
                    None => ABSENT,
                    Some(oid) if Some(oid) == head_oid => UNMODIFIED,
                    Some(_) => MODIFIED,
                }
            };

            let abs = self.work_path(&path);
            let workdir_slot = if self.store().exists(&abs)? {
                let data = self.store().read_file(&abs)?;
                if Some(blob_id(&data)) == head_oid {
                    UNMODIFIED
                } else {
                    MODIFIED
                }
            } else {
                ABSENT
            };

            rows.push(StatusRow {
                path,
                head: head_slot,
                index: index_slot,
                workdir: workdir_slot,
            });
        }
        Ok(rows)
    }

    /// Compute the categorised status report.
    ///
    /// # Errors
    /// Filesystem failures and corrupt objects.
    pub fn status_report(&self) -> Result<StatusReport> {
        let head = self.flatten_commit(self.head_oid()?)?;
        let index = self.load_index()?;
        let mut report = StatusReport {
            branch: self.current_branch()?,
            ..StatusReport::default()
        };

        for row in self.status_matrix()? {
            let path = row.path;
            if row.index == CONFLICTED {
                report.conflicted.push(path);
                continue;
            }
            let head_oid = head.get(&path).copied();
            let index_oid = index.staged_oid(&path);

            match (row.head, row.index) {
                (ABSENT, ABSENT) => {
                    if row.workdir != ABSENT {
                        report.untracked.push(path.clone());
                    }
                }
                (ABSENT, _) => report.staged_new.push(path.clone()),
                (_, ABSENT) => report.staged_deleted.push(path.clone()),
                _ if head_oid != index_oid => report.staged_modified.push(path.clone()),
                _ => {}
            }

            // Worktree vs index: unstaged changes on tracked paths.
            if let Some(staged) = index_oid {
                if row.workdir == ABSENT {
                    report.unstaged_deleted.push(path);
                } else {
                    let data = self.store().read_file(&self.work_path(&path))?;
                    if blob_id(&data) != staged {
                        report.unstaged_modified.push(path);
                    }
                }
            }
        }
        Ok(report)
    }
}
