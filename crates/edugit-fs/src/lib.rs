//! The [`FileStore`] trait — the single abstraction boundary between the
//! edugit engine and whatever actually holds the bytes.
//!
//! The engine interacts with storage exclusively through this trait. The
//! trait is object-safe so callers can use `dyn FileStore` or
//! `Arc<dyn FileStore>`.
//!
//! # Path model
//!
//! Paths are virtual absolute strings on a hierarchical namespace:
//! a leading `/`, `/`-separated segments, and no trailing `/` except for
//! the root itself. `.` and `..` are resolved by [`path::normalize`]
//! before a path ever reaches a store implementation.
//!
//! # Implementations
//!
//! - [`MemStore`] — a mutex-guarded in-memory tree; the stand-in for the
//!   browser virtual filesystem and the default backing for tests.
//! - [`DiskStore`] — rooted on a real directory via `std::fs`.

pub mod mem;
pub mod os;
pub mod path;

use std::fmt;

use thiserror::Error;

pub use mem::MemStore;
pub use os::DiskStore;

// ---------------------------------------------------------------------------
// FsError
// ---------------------------------------------------------------------------

/// What went wrong inside a store operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsErrorKind {
    /// The path (or one of its parents) does not exist.
    NotFound,
    /// The path already exists and the operation required it not to.
    Exists,
    /// A node on the path has the wrong kind (file where a directory was
    /// expected, or the reverse).
    NotADirectory,
    /// The directory is not empty.
    NotEmpty,
    /// The path failed normalisation (escaped the root, empty segment).
    InvalidPath,
}

impl fmt::Display for FsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Exists => write!(f, "already exists"),
            Self::NotADirectory => write!(f, "not a directory"),
            Self::NotEmpty => write!(f, "directory not empty"),
            Self::InvalidPath => write!(f, "invalid path"),
        }
    }
}

/// Error returned by every [`FileStore`] operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {path}")]
pub struct FsError {
    /// The failure classification.
    pub kind: FsErrorKind,
    /// The path the operation was applied to.
    pub path: String,
}

impl FsError {
    /// Build an error for `path` with the given kind.
    #[must_use]
    pub fn new(kind: FsErrorKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Shorthand for a [`FsErrorKind::NotFound`] error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(FsErrorKind::NotFound, path)
    }
}

/// Result alias used throughout this crate.
pub type FsResult<T> = Result<T, FsError>;

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The kind of a node reported by [`FileStore::stat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular file holding bytes.
    File,
    /// A directory holding named children.
    Dir,
}

impl NodeKind {
    /// Returns `true` for [`NodeKind::Dir`].
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Dir)
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Hierarchical path I/O consumed by the edugit engine.
///
/// All paths are normalised virtual absolute paths (see [`path`]).
/// Implementations take `&self`; interior mutability is the
/// implementation's concern. The engine is single-writer by construction
/// (commands run serially), so stores only need to be consistent, not
/// transactional.
pub trait FileStore: Send + Sync {
    /// Report the node at `path`, or `None` if nothing is there.
    fn stat(&self, path: &str) -> FsResult<Option<NodeKind>>;

    /// List the child names of the directory at `path`, sorted.
    fn read_dir(&self, path: &str) -> FsResult<Vec<String>>;

    /// Read the bytes of the file at `path`.
    fn read_file(&self, path: &str) -> FsResult<Vec<u8>>;

    /// Create or replace the file at `path`. The parent directory must
    /// already exist; use [`write_file_all`](FileStore::write_file_all)
    /// to create it on demand.
    fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()>;

    /// Move the node at `from` to `to`, replacing an existing file at the
    /// destination. Fails with [`FsErrorKind::Exists`] if `to` is an
    /// existing directory.
    fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Remove the file at `path`.
    fn unlink(&self, path: &str) -> FsResult<()>;

    /// Create the directory at `path`. Succeeds silently if a directory
    /// is already there; the parent must exist.
    fn mkdir(&self, path: &str) -> FsResult<()>;

    /// Remove the empty directory at `path`.
    fn rmdir(&self, path: &str) -> FsResult<()>;

    // -- provided combinators ------------------------------------------------

    /// Returns `true` if anything exists at `path`.
    fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.stat(path)?.is_some())
    }

    /// Returns `true` if a directory exists at `path`.
    fn is_dir(&self, path: &str) -> FsResult<bool> {
        Ok(matches!(self.stat(path)?, Some(NodeKind::Dir)))
    }

    /// Create `path` and any missing ancestors.
    fn mkdir_all(&self, path: &str) -> FsResult<()> {
        let mut cur = String::from("/");
        for seg in path::segments(path) {
            cur = path::join(&cur, seg);
            self.mkdir(&cur)?;
        }
        Ok(())
    }

    /// Write the file at `path`, creating missing parent directories.
    fn write_file_all(&self, path: &str, data: &[u8]) -> FsResult<()> {
        if let Some(parent) = path::parent(path) {
            self.mkdir_all(&parent)?;
        }
        self.write_file(path, data)
    }

    /// Remove the node at `path` and, for a directory, everything below it.
    fn remove_all(&self, path: &str) -> FsResult<()> {
        match self.stat(path)? {
            None => Err(FsError::not_found(path)),
            Some(NodeKind::File) => self.unlink(path),
            Some(NodeKind::Dir) => {
                for name in self.read_dir(path)? {
                    self.remove_all(&path::join(path, &name))?;
                }
                self.rmdir(path)
            }
        }
    }

    /// Depth-first enumeration of every *file* at or below `path`, sorted.
    ///
    /// Directory names listed in `skip` are not descended into (matched
    /// against the child name, not the full path).
    fn walk_files(&self, path: &str, skip: &[&str]) -> FsResult<Vec<String>> {
        let mut out = Vec::new();
        match self.stat(path)? {
            None => return Ok(out),
            Some(NodeKind::File) => out.push(path.to_owned()),
            Some(NodeKind::Dir) => {
                for name in self.read_dir(path)? {
                    if skip.contains(&name.as_str()) {
                        continue;
                    }
                    out.extend(self.walk_files(&path::join(path, &name), skip)?);
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests — trait combinators against MemStore
// ---------------------------------------------------------------------------
