//! Error types for the edugit engine.
//!
//! [`GitError`] is the single error type returned by engine operations. It
//! uses rich enum variants so callers can match on specific failure modes
//! without parsing error messages. Conflicts during merge/rebase/cherry-pick
//! are *not* errors — those operations return outcome enums where a conflict
//! is an expected Ok value (see [`crate::op`]).

use edugit_fs::FsError;
use thiserror::Error;

/// Errors returned by edugit engine operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No enclosing repository was found walking up from the start path.
    #[error("not a git repository (or any of the parent directories): .git")]
    NotARepository,

    /// A requested object does not exist in the object store.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// Hex oid (possibly abbreviated) that failed to resolve.
        oid: String,
    },

    /// An object exists but its serialised form failed to parse.
    #[error("object {oid} is corrupt: {detail}")]
    CorruptObject {
        /// Hex oid of the corrupt object.
        oid: String,
        /// What failed while parsing.
        detail: String,
    },

    /// A short hex prefix matched more than one object.
    #[error("short object id {prefix} is ambiguous")]
    AmbiguousOid {
        /// The prefix as given.
        prefix: String,
    },

    /// A ref, revision expression, or branch name could not be resolved.
    #[error("unknown revision or path not in the working tree: '{name}'")]
    InvalidRef {
        /// The revision expression as given.
        name: String,
    },

    /// The working tree has changes that the operation would overwrite.
    #[error("your local changes to the following files would be overwritten")]
    DirtyWorkingTree {
        /// The overlapping paths, repo-relative.
        files: Vec<String>,
    },

    /// A branch, remote, or merge request with this name already exists.
    #[error("'{name}' already exists")]
    NameExists {
        /// The conflicting name.
        name: String,
    },

    /// `--continue` or `--abort` was given with no operation in progress.
    #[error("there is no operation in progress")]
    NoOperationInProgress,

    /// A merge, rebase, or cherry-pick is already in progress.
    #[error("{operation} in progress; resolve it with --continue or --abort first")]
    OperationInProgress {
        /// Which operation holds the lock ("merge", "rebase", "cherry-pick").
        operation: &'static str,
    },

    /// The index holds unresolved conflict entries.
    #[error("unresolved conflicts in the index")]
    UnresolvedConflicts {
        /// Paths that still carry stage 1/2/3 entries.
        files: Vec<String>,
    },

    /// A filesystem operation failed underneath the engine.
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, GitError>;
