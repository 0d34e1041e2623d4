//! The loopback remote protocol.
//!
//! Remotes are co-located repositories under `/.remotes/<name>` on the
//! same store — transport is object-file copying, nothing ever leaves
//! the process. Remote names map to paths through the repository's
//! remote table (`.git/remotes` as TOML, the host's config idiom).

pub mod merge_request;
pub mod protocol;

pub use protocol::{PullOutcome, PushOutcome};

use std::collections::BTreeMap;

use edugit_fs::path;
use serde::{Deserialize, Serialize};

use crate::error::{GitError, Result};
use crate::repo::{Repository, REMOTES_DIR};

/// The directory that hosts every remote repository.
#[must_use]
pub fn remotes_root() -> String {
    format!("/{REMOTES_DIR}")
}

/// The root directory of one remote repository.
#[must_use]
pub fn remote_path(name: &str) -> String {
    path::join(&remotes_root(), name)
}

// ---------------------------------------------------------------------------
// Remote table
// ---------------------------------------------------------------------------

/// The persisted remote table: remote name → url (a store path).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RemoteTable {
    #[serde(default)]
    remotes: BTreeMap<String, String>,
    /// Branch → upstream `remote/branch` set by `push -u`.
    #[serde(default)]
    upstreams: BTreeMap<String, String>,
}

impl Repository {
    fn load_remote_table(&self) -> Result<RemoteTable> {
        let p = self.git_path("remotes");
        if !self.store().exists(&p)? {
            return Ok(RemoteTable::default());
        }
        let raw = self.store().read_file(&p)?;
        toml::from_str(&String::from_utf8_lossy(&raw)).map_err(|e| GitError::CorruptObject {
            oid: "remotes".to_owned(),
            detail: e.to_string(),
        })
    }

    fn save_remote_table(&self, table: &RemoteTable) -> Result<()> {
        let text = toml::to_string(table).map_err(|e| GitError::CorruptObject {
            oid: "remotes".to_owned(),
            detail: e.to_string(),
        })?;
        self.store()
            .write_file_all(&self.git_path("remotes"), text.as_bytes())?;
        Ok(())
    }

    /// Register a remote.
    ///
    /// # Errors
    /// [`GitError::NameExists`] if the name is taken.
    pub fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        let mut table = self.load_remote_table()?;
        if table.remotes.contains_key(name) {
            return Err(GitError::NameExists {
                name: name.to_owned(),
            });
        }
        table.remotes.insert(name.to_owned(), url.to_owned());
        self.save_remote_table(&table)
    }

    /// The url of a remote, if registered.
    ///
    /// # Errors
    /// Filesystem failures and a corrupt remote table.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load_remote_table()?.remotes.get(name).cloned())
    }

    /// All registered remotes as `(name, url)`, sorted by name.
    ///
    /// # Errors
    /// Filesystem failures and a corrupt remote table.
    pub fn remote_list(&self) -> Result<Vec<(String, String)>> {
        Ok(self.load_remote_table()?.remotes.into_iter().collect())
    }

    /// Record `branch`'s upstream as `remote/merge_branch`.
    ///
    /// # Errors
    /// Filesystem failures and a corrupt remote table.
    pub fn set_upstream(&self, branch: &str, remote: &str, merge_branch: &str) -> Result<()> {
        let mut table = self.load_remote_table()?;
        table
            .upstreams
            .insert(branch.to_owned(), format!("{remote}/{merge_branch}"));
        self.save_remote_table(&table)
    }

    /// The upstream of `branch` as `(remote, branch)`, if set.
    ///
    /// # Errors
    /// Filesystem failures and a corrupt remote table.
    pub fn upstream_of(&self, branch: &str) -> Result<Option<(String, String)>> {
        Ok(self
            .load_remote_table()?
            .upstreams
            .get(branch)
            .and_then(|s| s.split_once('/'))
            .map(|(r, b)| (r.to_owned(), b.to_owned())))
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
    fn remote_paths() {
        assert_eq!(remotes_root(), "/.remotes");
        assert_eq!(remote_path("origin"), "/.remotes/origin");
    }

    #[test]
    fn add_list_and_duplicate() {
        let repo = repo();
        repo.remote_add("origin", "/.remotes/origin").unwrap();
        assert_eq!(
            repo.remote_url("origin").unwrap().as_deref(),
            Some("/.remotes/origin")
        );
        assert_eq!(
            repo.remote_list().unwrap(),
            vec![("origin".to_owned(), "/.remotes/origin".to_owned())]
        );
        let err = repo.remote_add("origin", "/.remotes/other").unwrap_err();
        assert!(matches!(err, GitError::NameExists { .. }));
    }

    #[test]
    fn upstream_roundtrip() {
        let repo = repo();
        assert_eq!(repo.upstream_of("main").unwrap(), None);
        repo.set_upstream("main", "origin", "main").unwrap();
        assert_eq!(
            repo.upstream_of("main").unwrap(),
            Some(("origin".to_owned(), "main".to_owned()))
        );
    }
}
