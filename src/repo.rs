//! Repository handle: discovery, initialisation, and path layout.
//!
//! A [`Repository`] is a store handle plus the repository root path.
//! Everything else (objects, refs, index, working tree) is read through
//! it on demand — there is no cached state, so concurrent observers
//! always see what is on the store.

use std::sync::Arc;

use edugit_fs::{path, FileStore};
use tracing::debug;

use crate::error::{GitError, Result};

/// Name of the git control directory inside a repository root.
pub const GIT_DIR: &str = ".git";

/// Name of the co-located remotes directory (never part of a working tree).
pub const REMOTES_DIR: &str = ".remotes";

/// Name of the merge-request record file inside a remote repository.
pub const MR_FILE: &str = ".edu_git_remote.json";

/// Control paths excluded from every working-tree enumeration.
pub const CONTROL_PATHS: [&str; 3] = [GIT_DIR, REMOTES_DIR, MR_FILE];

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// A repository rooted somewhere on a [`FileStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn FileStore>,
    root: String,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("root", &self.root).finish()
    }
}

impl Repository {
    /// Initialise a repository at `root`, creating the git directory and
    /// pointing `HEAD` at the (unborn) default branch.
    ///
    /// Returns `(repo, created)`; `created` is `false` when a git
    /// directory already existed (re-init is a no-op).
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn init(
        store: Arc<dyn FileStore>,
        root: &str,
        default_branch: &str,
    ) -> Result<(Self, bool)> {
        let repo = Self {
            store,
            root: root.to_owned(),
        };
        let gitdir = repo.git_dir();
        if repo.store.is_dir(&gitdir)? {
            return Ok((repo, false));
        }
        repo.store.mkdir_all(&repo.git_path("objects"))?;
        repo.store.mkdir_all(&repo.git_path("refs/heads"))?;
        repo.store.mkdir_all(&repo.git_path("refs/remotes"))?;
        repo.store.write_file(
            &repo.git_path("HEAD"),
            format!("ref: refs/heads/{default_branch}\n").as_bytes(),
        )?;
        debug!(root = %repo.root, branch = default_branch, "initialised repository");
        Ok((repo, true))
    }

    /// Open the repository whose root is exactly `root`.
    ///
    /// # Errors
    /// [`GitError::NotARepository`] if `root` has no git directory.
    pub fn open(store: Arc<dyn FileStore>, root: &str) -> Result<Self> {
        let repo = Self {
            store,
            root: root.to_owned(),
        };
        if repo.store.is_dir(&repo.git_dir())? {
            Ok(repo)
        } else {
            Err(GitError::NotARepository)
        }
    }

    /// Find the enclosing repository by walking parents of `start`
    /// looking for a git directory.
    ///
    /// # Errors
    /// [`GitError::NotARepository`] if no ancestor has one.
    pub fn discover(store: Arc<dyn FileStore>, start: &str) -> Result<Self> {
        let mut cur = start.to_owned();
        loop {
            let candidate = path::join(&cur, GIT_DIR);
            if store.is_dir(&candidate)? {
                return Ok(Self { store, root: cur });
            }
            match path::parent(&cur) {
                Some(parent) => cur = parent,
                None => return Err(GitError::NotARepository),
            }
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// The repository root (working-tree root).
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The git control directory.
    #[must_use]
    pub fn git_dir(&self) -> String {
        path::join(&self.root, GIT_DIR)
    }

    /// A path inside the git directory.
    #[must_use]
    pub fn git_path(&self, rel: &str) -> String {
        let mut p = self.git_dir();
        for seg in rel.split('/') {
            p = path::join(&p, seg);
        }
        p
    }

    /// An absolute working-tree path for a repo-relative one.
    #[must_use]
    pub fn work_path(&self, rel: &str) -> String {
        if rel.is_empty() {
            return self.root.clone();
        }
        let mut p = self.root.clone();
        for seg in rel.split('/') {
            p = path::join(&p, seg);
        }
        p
    }

    /// The repo-relative form of an absolute path, or `None` if the path
    /// is outside this repository.
    #[must_use]
    pub fn rel(&self, abs: &str) -> Option<String> {
        path::relative_to(&self.root, abs)
    }

    /// Enumerate every working-tree file (repo-relative, sorted),
    /// excluding the control paths.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn worktree_files(&self) -> Result<Vec<String>> {
        let files = self.store.walk_files(&self.root, &CONTROL_PATHS)?;
        Ok(files
            .into_iter()
            .filter_map(|f| self.rel(&f))
            .filter(|r| !r.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edugit_fs::MemStore;

    fn store() -> Arc<dyn FileStore> {
        Arc::new(MemStore::new())
    }

    #[test]
    fn init_creates_layout() {
        let s = store();
        let (repo, created) = Repository::init(Arc::clone(&s), "/", "main").unwrap();
        assert!(created);
        assert!(s.is_dir("/.git/objects").unwrap());
        assert!(s.is_dir("/.git/refs/heads").unwrap());
        assert_eq!(
            s.read_file("/.git/HEAD").unwrap(),
            b"ref: refs/heads/main\n"
        );
        assert_eq!(repo.git_dir(), "/.git");
    }

    #[test]
    fn reinit_is_noop() {
        let s = store();
        let (_, first) = Repository::init(Arc::clone(&s), "/", "main").unwrap();
        let (_, second) = Repository::init(Arc::clone(&s), "/", "main").unwrap();
        assert!(first);
        assert!(!second);
    }

    #[test]
    fn discover_walks_up() {
        let s = store();
        Repository::init(Arc::clone(&s), "/", "main").unwrap();
        s.mkdir_all("/src/deep").unwrap();
        let repo = Repository::discover(Arc::clone(&s), "/src/deep").unwrap();
        assert_eq!(repo.root(), "/");
    }

    #[test]
    fn discover_fails_outside() {
        let s = store();
        s.mkdir_all("/elsewhere").unwrap();
        let err = Repository::discover(s, "/elsewhere").unwrap_err();
        assert!(matches!(err, GitError::NotARepository));
    }

    #[test]
    fn nested_repo_wins_over_outer() {
        let s = store();
        Repository::init(Arc::clone(&s), "/", "main").unwrap();
        s.mkdir_all("/.remotes/origin").unwrap();
        Repository::init(Arc::clone(&s), "/.remotes/origin", "main").unwrap();
        let repo = Repository::discover(Arc::clone(&s), "/.remotes/origin").unwrap();
        assert_eq!(repo.root(), "/.remotes/origin");
    }

    #[test]
    fn work_path_and_rel_are_inverse() {
        let s = store();
        let (repo, _) = Repository::init(s, "/", "main").unwrap();
        let abs = repo.work_path("src/lib.rs");
        assert_eq!(abs, "/src/lib.rs");
        assert_eq!(repo.rel(&abs).as_deref(), Some("src/lib.rs"));
        assert_eq!(repo.rel("/.remotes/x"), Some(".remotes/x".to_owned()));
    }

    #[test]
    fn worktree_files_excludes_control_paths() {
        let s = store();
        let (repo, _) = Repository::init(Arc::clone(&s), "/", "main").unwrap();
        s.write_file_all("/src/a.txt", b"a").unwrap();
        s.write_file_all("/.remotes/origin/x.txt", b"x").unwrap();
        s.write_file("/.edu_git_remote.json", b"[]").unwrap();
        assert_eq!(repo.worktree_files().unwrap(), vec!["src/a.txt"]);
    }
}
