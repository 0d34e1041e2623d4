//! Loose object storage.
//!
//! Objects live under `.git/objects/<2-hex>/<38-hex>`, keyed by the hash
//! of their canonical serialisation. Writes are idempotent: rewriting
//! identical content lands on the same path with the same bytes, so the
//! store is effectively append-only and duplicate writes are safe.

use edugit_fs::path;
use tracing::trace;

use crate::error::{GitError, Result};
use crate::model::{Commit, Object, Oid, TreeEntry};
use crate::repo::Repository;

impl Repository {
    fn object_path(&self, oid: Oid) -> String {
        let hex = oid.to_hex();
        self.git_path(&format!("objects/{}/{}", &hex[..2], &hex[2..]))
    }

    /// Write an object, returning its oid. Idempotent.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn write_object(&self, object: &Object) -> Result<Oid> {
        let raw = object.encode();
        let oid = Oid::hash(&raw);
        let path = self.object_path(oid);
        if !self.store().exists(&path)? {
            self.store().write_file_all(&path, &raw)?;
            trace!(%oid, kind = %object.kind(), "wrote object");
        }
        Ok(oid)
    }

    /// Shorthand for writing a blob from raw bytes.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn write_blob(&self, data: &[u8]) -> Result<Oid> {
        self.write_object(&Object::Blob(data.to_vec()))
    }

    /// Read and decode any object.
    ///
    /// # Errors
    /// [`GitError::ObjectNotFound`] if absent, [`GitError::CorruptObject`]
    /// if the stored bytes fail to parse.
    pub fn read_object(&self, oid: Oid) -> Result<Object> {
        let path = self.object_path(oid);
        if !self.store().exists(&path)? {
            return Err(GitError::ObjectNotFound {
                oid: oid.to_hex(),
            });
        }
        let raw = self.store().read_file(&path)?;
        Object::decode(&raw).map_err(|detail| GitError::CorruptObject {
            oid: oid.to_hex(),
            detail,
        })
    }

    /// Read a blob's bytes.
    ///
    /// # Errors
    /// [`GitError::ObjectNotFound`] or [`GitError::CorruptObject`] when
    /// the oid is missing or does not name a blob.
    pub fn read_blob(&self, oid: Oid) -> Result<Vec<u8>> {
        match self.read_object(oid)? {
            Object::Blob(data) => Ok(data),
            other => Err(GitError::CorruptObject {
                oid: oid.to_hex(),
                detail: format!("expected blob, found {}", other.kind()),
            }),
        }
    }

    /// Read a tree's entries.
    ///
    /// # Errors
    /// As [`read_blob`](Repository::read_blob), for trees.
    pub fn read_tree(&self, oid: Oid) -> Result<Vec<TreeEntry>> {
        match self.read_object(oid)? {
            Object::Tree(entries) => Ok(entries),
            other => Err(GitError::CorruptObject {
                oid: oid.to_hex(),
                detail: format!("expected tree, found {}", other.kind()),
            }),
        }
    }

    /// Read a commit.
    ///
    /// # Errors
    /// As [`read_blob`](Repository::read_blob), for commits.
    pub fn read_commit(&self, oid: Oid) -> Result<Commit> {
        match self.read_object(oid)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(GitError::CorruptObject {
                oid: oid.to_hex(),
                detail: format!("expected commit, found {}", other.kind()),
            }),
        }
    }

    /// Returns `true` if an object with this oid is present.
    ///
    /// # Errors
    /// Filesystem failures only.
    pub fn has_object(&self, oid: Oid) -> Result<bool> {
        Ok(self.store().exists(&self.object_path(oid))?)
    }

    /// Expand an unambiguous 4–39 character hex prefix to a full oid.
    ///
    /// # Errors
    /// [`GitError::ObjectNotFound`] when nothing matches,
    /// [`GitError::AmbiguousOid`] when more than one object does.
    pub fn expand_oid(&self, prefix: &str) -> Result<Oid> {
        if prefix.len() == Oid::HEX_LEN {
            let oid: Oid = prefix.parse().map_err(|_| GitError::ObjectNotFound {
                oid: prefix.to_owned(),
            })?;
            return if self.has_object(oid)? {
                Ok(oid)
            } else {
                Err(GitError::ObjectNotFound {
                    oid: prefix.to_owned(),
                })
            };
        }

        let objects_dir = self.git_path("objects");
        let (fan, rest) = prefix.split_at(2.min(prefix.len()));
        let mut matches = Vec::new();
        let fanouts = if fan.len() == 2 {
            vec![fan.to_owned()]
        } else {
            // 4-char minimum means this branch is unreachable from the
            // shell, but expand_oid is also a library entry point.
            self.store().read_dir(&objects_dir).unwrap_or_default()
        };
        for dir in fanouts {
            let dir_path = path::join(&objects_dir, &dir);
            if !self.store().is_dir(&dir_path)? {
                continue;
            }
            for name in self.store().read_dir(&dir_path)? {
                if name.starts_with(rest) {
                    let full = format!("{dir}{name}");
                    if let Ok(oid) = full.parse::<Oid>() {
                        matches.push(oid);
                    }
                }
            }
        }
        match matches.len() {
            0 => Err(GitError::ObjectNotFound {
                oid: prefix.to_owned(),
            }),
            1 => Ok(matches[0]),
            _ => Err(GitError::AmbiguousOid {
                prefix: prefix.to_owned(),
            }),
        }
    }
}
