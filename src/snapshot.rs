//! Workspace snapshot export/import.
//!
//! A snapshot captures the entire store (every directory and file, with
//! file bytes base64-encoded), the UI selection state, and the
//! aggregated merge-request records, as one JSON document. Import
//! clears the store and recreates every entry. The snapshot is owned by
//! an explicit [`Workspace`] handle — there is no global state.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use edugit_fs::{path, FileStore, MemStore, NodeKind};
use serde::{Deserialize, Serialize};

use crate::error::{GitError, Result};
use crate::remote::merge_request::MergeRequest;
use crate::remote::protocol::list_remote_repos;
use crate::remote::remote_path;
use crate::repo::Repository;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Snapshot document
// ---------------------------------------------------------------------------

/// Entry kind inside a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory.
    Dir,
    /// A file with base64 data.
    File,
}

/// One store node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    /// Absolute store path.
    pub path: String,
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Base64 file bytes (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The UI selection carried through a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    /// The file open in the editor.
    #[serde(default)]
    pub selected_file_path: Option<String>,
    /// Every open editor tab.
    #[serde(default)]
    pub open_file_paths: Vec<String>,
}

/// The exported document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Unix seconds at export time.
    pub created_at: i64,
    /// Every store node, parents before children.
    pub entries: Vec<SnapshotEntry>,
    /// UI selection.
    #[serde(default)]
    pub ui: UiState,
    /// Aggregated merge-request records across all remotes (the record
    /// files themselves travel inside `entries`; this field is the
    /// UI-facing union).
    #[serde(default)]
    pub merge_requests: Vec<MergeRequest>,
}

// ---------------------------------------------------------------------------
// Workspace handle
// ---------------------------------------------------------------------------

/// Owns export/import of one store.
pub struct Workspace {
    store: Arc<MemStore>,
}

impl Workspace {
    /// Wrap a memory store for snapshotting.
    #[must_use]
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }

    /// The wrapped store as a trait object.
    #[must_use]
    pub fn store(&self) -> Arc<dyn FileStore> {
        Arc::<MemStore>::clone(&self.store) as Arc<dyn FileStore>
    }

    /// Export the full store state.
    ///
    /// # Errors
    /// Filesystem failures and corrupt merge-request files.
    pub fn export(&self, ui: UiState, created_at: i64) -> Result<Snapshot> {
        let store = self.store();
        let mut entries = Vec::new();
        collect_entries(&store, "/", &mut entries)?;

        let mut merge_requests = Vec::new();
        for name in list_remote_repos(&store)? {
            let root = remote_path(&name);
            if let Ok(repo) = Repository::open(Arc::clone(&store), &root) {
                merge_requests.extend(repo.load_merge_requests()?);
            }
        }

        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            created_at,
            entries,
            ui,
            merge_requests,
        })
    }

    /// Clear the store and recreate every snapshot entry.
    ///
    /// # Errors
    /// [`GitError::CorruptObject`] on bad base64 or an unsupported
    /// version; filesystem failures.
    pub fn import(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GitError::CorruptObject {
                oid: "snapshot".to_owned(),
                detail: format!("unsupported version {}", snapshot.version),
            });
        }
        self.store.clear();
        let store = self.store();
        for entry in &snapshot.entries {
            match entry.kind {
                EntryKind::Dir => store.mkdir_all(&entry.path)?,
                EntryKind::File => {
                    let data = entry.data.as_deref().unwrap_or("");
                    let bytes = BASE64.decode(data).map_err(|e| GitError::CorruptObject {
                        oid: entry.path.clone(),
                        detail: format!("bad base64: {e}"),
                    })?;
                    store.write_file_all(&entry.path, &bytes)?;
                }
            }
        }
        Ok(())
    }
}

fn collect_entries(
    store: &Arc<dyn FileStore>,
    dir: &str,
    out: &mut Vec<SnapshotEntry>,
) -> Result<()> {
    for name in store.read_dir(dir)? {
        let child = path::join(dir, &name);
        match store.stat(&child)? {
            Some(NodeKind::Dir) => {
                out.push(SnapshotEntry {
                    path: child.clone(),
                    kind: EntryKind::Dir,
                    data: None,
                });
                collect_entries(store, &child, out)?;
            }
            Some(NodeKind::File) => {
                let bytes = store.read_file(&child)?;
                out.push(SnapshotEntry {
                    path: child,
                    kind: EntryKind::File,
                    data: Some(BASE64.encode(bytes)),
                });
            }
            None => {}
        }
    }
    Ok(())
}
