//! Clone / fork / create / push / fetch / pull over the loopback
//! transport.
//!
//! Transport is object-file copying between the two `.git/objects`
//! trees — content-addressed names make every copy idempotent, so
//! partial transfers are harmless and retried copies are no-ops. Fetch
//! and push check the cancellation flag between object copies.

use std::sync::Arc;

use edugit_fs::{path, FileStore};
use tracing::{debug, info};

use crate::cancel::CancelFlag;
use crate::config::Identity;
use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::op::MergeOutcome;
use crate::remote::{remote_path, remotes_root};
use crate::repo::Repository;

/// Pull is fetch followed by a merge; outcomes are merge outcomes.
pub type PullOutcome = MergeOutcome;

/// The result of a push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote already had this tip.
    UpToDate,
    /// The remote branch moved.
    Updated {
        /// The pushed branch.
        branch: String,
        /// The new remote tip.
        to: Oid,
    },
    /// The remote tip is not an ancestor of ours; push refused.
    RejectedNonFastForward,
}

/// Create an empty remote repository under `/.remotes/<name>`.
///
/// # Errors
/// [`GitError::NameExists`] when the directory is taken.
pub fn create_remote(
    store: &Arc<dyn FileStore>,
    name: &str,
    default_branch: &str,
) -> Result<Repository> {
    let root = remote_path(name);
    if store.exists(&root)? {
        return Err(GitError::NameExists {
            name: name.to_owned(),
        });
    }
    store.mkdir_all(&root)?;
    let (repo, _) = Repository::init(Arc::clone(store), &root, default_branch)?;
    info!(name, "created remote repository");
    Ok(repo)
}

/// Fork `src` into a new remote `dst`: a fresh repository that receives
/// every object file and every ref of the source, then materialises its
/// default branch.
///
/// # Errors
/// [`GitError::NameExists`] for a taken destination,
/// [`GitError::NotARepository`] for a missing source.
pub fn fork_remote(store: &Arc<dyn FileStore>, src: &str, dst: &str) -> Result<Repository> {
    let src_repo = Repository::open(Arc::clone(store), &remote_path(src))?;
    let dst_repo = create_remote(store, dst, "main")?;

    copy_objects(&src_repo, &dst_repo, &CancelFlag::new())?;
    for (name, oid) in src_repo.refs_under("refs")? {
        dst_repo.write_ref(&name, oid, true)?;
    }
    // Mirror HEAD, then materialise the checked-out branch.
    let head_raw = store.read_file(&src_repo.git_path("HEAD"))?;
    store.write_file(&dst_repo.git_path("HEAD"), &head_raw)?;
    if let Some(tip) = dst_repo.head_oid()? {
        dst_repo.reset_worktree_and_index(&dst_repo.flatten_commit(Some(tip))?)?;
    }
    info!(src, dst, "forked remote repository");
    Ok(dst_repo)
}

/// Clone the remote at `url` into a local repository rooted at
/// `target_root`: objects, tracking refs, `origin` registration, and a
/// checkout of the remote's default branch.
///
/// # Errors
/// [`GitError::NotARepository`] for a bad url,
/// [`GitError::NameExists`] when the target already holds a repository.
pub fn clone_repo(
    store: &Arc<dyn FileStore>,
    url: &str,
    target_root: &str,
    cancel: &CancelFlag,
) -> Result<Repository> {
    let remote_repo = Repository::open(Arc::clone(store), url)?;
    if store.exists(&path::join(target_root, crate::repo::GIT_DIR))? {
        return Err(GitError::NameExists {
            name: target_root.to_owned(),
        });
    }
    store.mkdir_all(target_root)?;
    let default_branch = remote_repo
        .current_branch()?
        .unwrap_or_else(|| "main".to_owned());
    let (local, _) = Repository::init(Arc::clone(store), target_root, &default_branch)?;

    copy_objects(&remote_repo, &local, cancel)?;
    for branch in remote_repo.list_branches()? {
        if let Some(tip) = remote_repo.read_ref(&format!("refs/heads/{branch}"))? {
            local.write_ref(&format!("refs/remotes/origin/{branch}"), tip, true)?;
        }
    }
    local.remote_add("origin", url)?;

    if let Some(tip) = remote_repo.read_ref(&format!("refs/heads/{default_branch}"))? {
        local.write_ref(&format!("refs/heads/{default_branch}"), tip, true)?;
        local.set_upstream(&default_branch, "origin", &default_branch)?;
        local.reset_worktree_and_index(&local.flatten_commit(Some(tip))?)?;
    }
    info!(url, target_root, "cloned repository");
    Ok(local)
}

impl Repository {
    /// Resolve a remote name (or bare `/.remotes` path) to its
    /// repository.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for an unknown remote.
    pub fn open_remote(&self, name: &str) -> Result<Repository> {
        let url = match self.remote_url(name)? {
            Some(url) => url,
            None if name.starts_with('/') => name.to_owned(),
            None => {
                let fallback = remote_path(name);
                if self.store().is_dir(&fallback)? {
                    fallback
                } else {
                    return Err(GitError::InvalidRef {
                        name: name.to_owned(),
                    });
                }
            }
        };
        Repository::open(Arc::clone(self.store()), &url)
    }

    /// Push `branch` to `remote`: copy objects, then move the remote
    /// ref (fast-forward only). Updates the local tracking ref and,
    /// when the remote has that branch checked out, its working tree.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for unknown remote or branch.
    pub fn push(
        &self,
        remote: &str,
        branch: &str,
        set_upstream: bool,
        cancel: &CancelFlag,
    ) -> Result<PushOutcome> {
        let remote_repo = self.open_remote(remote)?;
        let local_oid = self.resolve_ref(&format!("refs/heads/{branch}"))?;

        copy_objects(self, &remote_repo, cancel)?;

        let remote_ref = format!("refs/heads/{branch}");
        let remote_oid = remote_repo.read_ref(&remote_ref)?;
        if remote_oid == Some(local_oid) {
            return Ok(PushOutcome::UpToDate);
        }
        if let Some(old) = remote_oid {
            if !remote_repo.is_descendent(local_oid, old)? {
                return Ok(PushOutcome::RejectedNonFastForward);
            }
        }
        remote_repo.write_ref(&remote_ref, local_oid, true)?;
        self.write_ref(&format!("refs/remotes/{remote}/{branch}"), local_oid, true)?;

        if remote_repo.current_branch()?.as_deref() == Some(branch) {
            remote_repo
                .reset_worktree_and_index(&remote_repo.flatten_commit(Some(local_oid))?)?;
        }
        if set_upstream {
            self.set_upstream(branch, remote, branch)?;
        }
        info!(remote, branch, to = %local_oid.short(), "pushed");
        Ok(PushOutcome::Updated {
            branch: branch.to_owned(),
            to: local_oid,
        })
    }

    /// Fetch from `remote`: copy objects here, then update the tracking
    /// refs (one branch, or all of them).
    ///
    /// Returns the updated `(branch, tip)` pairs.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for an unknown remote.
    pub fn fetch(
        &self,
        remote: &str,
        branch: Option<&str>,
        cancel: &CancelFlag,
    ) -> Result<Vec<(String, Oid)>> {
        let remote_repo = self.open_remote(remote)?;
        copy_objects(&remote_repo, self, cancel)?;
        if cancel.is_cancelled() {
            // Interrupted between the transfer and the ref updates; the
            // copied objects keep, the tracking refs stay put.
            return Ok(Vec::new());
        }

        let branches = match branch {
            Some(b) => vec![b.to_owned()],
            None => remote_repo.list_branches()?,
        };
        let mut updated = Vec::new();
        for b in branches {
            let Some(tip) = remote_repo.read_ref(&format!("refs/heads/{b}"))? else {
                return Err(GitError::InvalidRef {
                    name: format!("{remote}/{b}"),
                });
            };
            self.write_ref(&format!("refs/remotes/{remote}/{b}"), tip, true)?;
            updated.push((b, tip));
        }
        info!(remote, count = updated.len(), "fetched");
        Ok(updated)
    }

    /// Pull: fetch `remote`'s branch, then merge the tracking ref into
    /// the current branch (fast-forward when possible, merge commit or
    /// merge-in-progress otherwise).
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] when no branch can be determined.
    pub fn pull(
        &self,
        remote: &str,
        branch: Option<&str>,
        identity: &Identity,
        cancel: &CancelFlag,
    ) -> Result<PullOutcome> {
        let branch = match branch {
            Some(b) => b.to_owned(),
            None => {
                let current = self.current_branch()?.ok_or_else(|| GitError::InvalidRef {
                    name: "HEAD".to_owned(),
                })?;
                self.upstream_of(&current)?
                    .map_or(current, |(_, upstream_branch)| upstream_branch)
            }
        };
        self.fetch(remote, Some(&branch), cancel)?;
        self.merge(&format!("{remote}/{branch}"), identity)
    }
}

/// Copy every loose object file from `src` to `dst`, skipping objects
/// already present.
fn copy_objects(src: &Repository, dst: &Repository, cancel: &CancelFlag) -> Result<()> {
    let src_objects = src.git_path("objects");
    let dst_objects = dst.git_path("objects");
    let mut copied = 0usize;
    for file in src.store().walk_files(&src_objects, &[])? {
        if cancel.is_cancelled() {
            debug!(copied, "object copy cancelled");
            return Ok(());
        }
        let Some(rel) = path::relative_to(&src_objects, &file) else {
            continue;
        };
        let target = {
            let mut t = dst_objects.clone();
            for seg in rel.split('/') {
                t = path::join(&t, seg);
            }
            t
        };
        if !dst.store().exists(&target)? {
            let data = src.store().read_file(&file)?;
            dst.store().write_file_all(&target, &data)?;
            copied += 1;
        }
    }
    debug!(copied, "copied objects");
    Ok(())
}

/// List the names of every remote repository, sorted.
///
/// # Errors
/// Filesystem failures only.
pub fn list_remote_repos(store: &Arc<dyn FileStore>) -> Result<Vec<String>> {
    let root = remotes_root();
    if !store.is_dir(&root)? {
        return Ok(Vec::new());
    }
    store.read_dir(&root).map_err(Into::into)
}
