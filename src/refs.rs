//! Ref namespace: branch pointers, remote-tracking refs, and `HEAD`.
//!
//! Refs are mutable atomic-pointer slots stored as `<hex>\n` under the
//! git directory. `HEAD` is either symbolic (`ref: refs/heads/<b>`) or a
//! detached oid. An unborn branch (symbolic `HEAD` whose target ref does
//! not exist yet) resolves to `None` rather than raising.

use edugit_fs::path;
use tracing::debug;

use crate::error::{GitError, Result};
use crate::model::types::is_hex_prefix;
use crate::model::Oid;
use crate::repo::Repository;

/// The symbolic-ref prefix inside `HEAD`.
const SYMREF: &str = "ref: ";

/// What `HEAD` currently points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// Symbolic ref onto a branch (which may be unborn).
    Branch(String),
    /// Detached onto a commit.
    Detached(Oid),
}

impl Repository {
    fn ref_path(&self, name: &str) -> String {
        self.git_path(name)
    }

    /// Read a fully qualified ref (`refs/heads/x`, `refs/remotes/o/x`),
    /// returning `None` if it does not exist.
    ///
    /// # Errors
    /// Filesystem failures and corrupt ref contents.
    pub fn read_ref(&self, name: &str) -> Result<Option<Oid>> {
        let p = self.ref_path(name);
        if !self.store().exists(&p)? {
            return Ok(None);
        }
        let raw = self.store().read_file(&p)?;
        let text = String::from_utf8_lossy(&raw);
        let oid = text.trim().parse().map_err(|_| GitError::CorruptObject {
            oid: text.trim().to_owned(),
            detail: format!("malformed ref {name}"),
        })?;
        Ok(Some(oid))
    }

    /// Create or move a ref.
    ///
    /// With `force = false` the ref must not already exist (branch
    /// creation); with `force = true` the slot is overwritten (branch
    /// movement, fetch updates).
    ///
    /// # Errors
    /// [`GitError::NameExists`] on a non-forced overwrite.
    pub fn write_ref(&self, name: &str, oid: Oid, force: bool) -> Result<()> {
        if !force && self.read_ref(name)?.is_some() {
            return Err(GitError::NameExists {
                name: name.to_owned(),
            });
        }
        self.store()
            .write_file_all(&self.ref_path(name), format!("{oid}\n").as_bytes())?;
        debug!(ref_name = name, %oid, "wrote ref");
        Ok(())
    }

    /// Delete a ref.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] if the ref does not exist.
    pub fn delete_ref(&self, name: &str) -> Result<()> {
        let p = self.ref_path(name);
        if !self.store().exists(&p)? {
            return Err(GitError::InvalidRef {
                name: name.to_owned(),
            });
        }
        self.store().unlink(&p)?;
        Ok(())
    }

    /// Read `HEAD` without following the branch pointer.
    ///
    /// # Errors
    /// Filesystem failures and a malformed `HEAD` file.
    pub fn head(&self) -> Result<Head> {
        let raw = self.store().read_file(&self.git_path("HEAD"))?;
        let text = String::from_utf8_lossy(&raw);
        let text = text.trim();
        if let Some(target) = text.strip_prefix(SYMREF) {
            let branch = target
                .strip_prefix("refs/heads/")
                .unwrap_or(target)
                .to_owned();
            Ok(Head::Branch(branch))
        } else {
            let oid = text.parse().map_err(|_| GitError::CorruptObject {
                oid: text.to_owned(),
                detail: "malformed HEAD".to_owned(),
            })?;
            Ok(Head::Detached(oid))
        }
    }

    /// The commit `HEAD` resolves to, or `None` on an unborn branch.
    ///
    /// # Errors
    /// Filesystem failures and corrupt refs.
    pub fn head_oid(&self) -> Result<Option<Oid>> {
        match self.head()? {
            Head::Branch(branch) => self.read_ref(&format!("refs/heads/{branch}")),
            Head::Detached(oid) => Ok(Some(oid)),
        }
    }

    /// The current branch name, or `None` when detached.
    ///
    /// # Errors
    /// Filesystem failures and a malformed `HEAD` file.
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.head()? {
            Head::Branch(branch) => Ok(Some(branch)),
            Head::Detached(_) => Ok(None),
        }
    }

    /// Point `HEAD` at a branch (symbolic).
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn set_head_branch(&self, branch: &str) -> Result<()> {
        self.store().write_file(
            &self.git_path("HEAD"),
            format!("{SYMREF}refs/heads/{branch}\n").as_bytes(),
        )?;
        Ok(())
    }

    /// Detach `HEAD` onto a commit.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn set_head_detached(&self, oid: Oid) -> Result<()> {
        self.store()
            .write_file(&self.git_path("HEAD"), format!("{oid}\n").as_bytes())?;
        Ok(())
    }

    /// List local branch names, sorted.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let dir = self.git_path("refs/heads");
        if !self.store().is_dir(&dir)? {
            return Ok(Vec::new());
        }
        self.store().read_dir(&dir).map_err(Into::into)
    }

    /// List tracking branch names for one remote, sorted.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn list_remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let dir = self.git_path(&format!("refs/remotes/{remote}"));
        if !self.store().is_dir(&dir)? {
            return Ok(Vec::new());
        }
        self.store().read_dir(&dir).map_err(Into::into)
    }

    /// List the remotes that have tracking refs, sorted.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn list_tracking_remotes(&self) -> Result<Vec<String>> {
        let dir = self.git_path("refs/remotes");
        if !self.store().is_dir(&dir)? {
            return Ok(Vec::new());
        }
        self.store().read_dir(&dir).map_err(Into::into)
    }

    /// Resolve a refish to an oid.
    ///
    /// Accepts, in order: `HEAD`, a fully qualified ref, a local branch
    /// shorthand, a `remote/branch` shorthand, a full 40-char oid, and an
    /// unambiguous hex prefix.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] when nothing matches (including `HEAD`
    /// on an unborn branch); [`GitError::AmbiguousOid`] from prefix
    /// expansion.
    pub fn resolve_ref(&self, name: &str) -> Result<Oid> {
        if name == "HEAD" {
            return self.head_oid()?.ok_or_else(|| GitError::InvalidRef {
                name: name.to_owned(),
            });
        }
        if name.starts_with("refs/") {
            return self.read_ref(name)?.ok_or_else(|| GitError::InvalidRef {
                name: name.to_owned(),
            });
        }
        if let Some(oid) = self.read_ref(&format!("refs/heads/{name}"))? {
            return Ok(oid);
        }
        if let Some((remote, branch)) = name.split_once('/') {
            if let Some(oid) = self.read_ref(&format!("refs/remotes/{remote}/{branch}"))? {
                return Ok(oid);
            }
        }
        if is_hex_prefix(name) {
            return match self.expand_oid(name) {
                Ok(oid) => Ok(oid),
                Err(GitError::ObjectNotFound { .. }) => Err(GitError::InvalidRef {
                    name: name.to_owned(),
                }),
                Err(other) => Err(other),
            };
        }
        Err(GitError::InvalidRef {
            name: name.to_owned(),
        })
    }

    /// All refs under a namespace as `(name, oid)` pairs, recursively.
    ///
    /// `prefix` is relative to the git directory, e.g. `"refs/heads"`.
    ///
    /// # Errors
    /// Filesystem failures and corrupt refs.
    pub fn refs_under(&self, prefix: &str) -> Result<Vec<(String, Oid)>> {
        let dir = self.git_path(prefix);
        let mut out = Vec::new();
        if !self.store().is_dir(&dir)? {
            return Ok(out);
        }
        for file in self.store().walk_files(&dir, &[])? {
            let rel = path::relative_to(&self.git_dir(), &file)
                .unwrap_or_default();
            if let Some(oid) = self.read_ref(&rel)? {
                out.push((rel, oid));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::MemStore;

    use super::*;

    fn repo() -> Repository {
        let store: Arc<dyn edugit_fs::FileStore> = Arc::new(MemStore::new());
        Repository::init(store, "/", "main").unwrap().0
    }

    #[test]
    fn unborn_head_resolves_to_none() {
        let repo = repo();
        assert_eq!(repo.head_oid().unwrap(), None);
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn write_and_resolve_branch() {
        let repo = repo();
        let oid = Oid::hash(b"commit");
        repo.write_ref("refs/heads/main", oid, false).unwrap();
        assert_eq!(repo.resolve_ref("main").unwrap(), oid);
        assert_eq!(repo.resolve_ref("refs/heads/main").unwrap(), oid);
        assert_eq!(repo.resolve_ref("HEAD").unwrap(), oid);
    }

    #[test]
    fn non_forced_write_refuses_overwrite() {
        let repo = repo();
        let a = Oid::hash(b"a");
        let b = Oid::hash(b"b");
        repo.write_ref("refs/heads/dev", a, false).unwrap();
        let err = repo.write_ref("refs/heads/dev", b, false).unwrap_err();
        assert!(matches!(err, GitError::NameExists { .. }));
        repo.write_ref("refs/heads/dev", b, true).unwrap();
        assert_eq!(repo.read_ref("refs/heads/dev").unwrap(), Some(b));
    }

    #[test]
    fn remote_shorthand_resolves() {
        let repo = repo();
        let oid = Oid::hash(b"remote tip");
        repo.write_ref("refs/remotes/origin/main", oid, false).unwrap();
        assert_eq!(repo.resolve_ref("origin/main").unwrap(), oid);
        assert_eq!(repo.list_remote_branches("origin").unwrap(), vec!["main"]);
        assert_eq!(repo.list_tracking_remotes().unwrap(), vec!["origin"]);
    }

    #[test]
    fn detached_head() {
        let repo = repo();
        let oid = Oid::hash(b"detach");
        repo.set_head_detached(oid).unwrap();
        assert_eq!(repo.head().unwrap(), Head::Detached(oid));
        assert_eq!(repo.current_branch().unwrap(), None);
        assert_eq!(repo.head_oid().unwrap(), Some(oid));
        repo.set_head_branch("main").unwrap();
        assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn delete_ref_requires_existence() {
        let repo = repo();
        let err = repo.delete_ref("refs/heads/ghost").unwrap_err();
        assert!(matches!(err, GitError::InvalidRef { .. }));
        repo.write_ref("refs/heads/gone", Oid::hash(b"x"), false).unwrap();
        repo.delete_ref("refs/heads/gone").unwrap();
        assert_eq!(repo.read_ref("refs/heads/gone").unwrap(), None);
    }

    #[test]
    fn list_branches_sorted() {
        let repo = repo();
        let oid = Oid::hash(b"c");
        repo.write_ref("refs/heads/main", oid, false).unwrap();
        repo.write_ref("refs/heads/dev", oid, false).unwrap();
        assert_eq!(repo.list_branches().unwrap(), vec!["dev", "main"]);
    }

    #[test]
    fn resolve_ref_falls_back_to_oid_prefix() {
        let repo = repo();
        let oid = repo.write_blob(b"object").unwrap();
        let prefix = &oid.to_hex()[..10];
        assert_eq!(repo.resolve_ref(prefix).unwrap(), oid);
        assert!(matches!(
            repo.resolve_ref("nonsense").unwrap_err(),
            GitError::InvalidRef { .. }
        ));
    }

    #[test]
    fn refs_under_walks_namespace() {
        let repo = repo();
        let oid = Oid::hash(b"z");
        repo.write_ref("refs/heads/main", oid, false).unwrap();
        repo.write_ref("refs/remotes/origin/main", oid, false).unwrap();
        let heads = repo.refs_under("refs/heads").unwrap();
        assert_eq!(heads, vec![("refs/heads/main".to_owned(), oid)]);
        let all = repo.refs_under("refs").unwrap();
        assert_eq!(all.len(), 2);
    }
}
