//! edugit — an embedded educational git engine over a virtual
//! filesystem.
//!
//! The engine implements git's object model (content-addressed
//! commits/trees/blobs and refs), an index with conflict stages, a
//! line-level diff engine with gutter projections, three-way merge, the
//! merge/rebase/cherry-pick state machines persisted under `.git`, and
//! a loopback remote protocol with merge requests — all over the
//! [`edugit_fs::FileStore`] capability, so the same engine drives the
//! terminal shell and the visual workspace.
//!
//! Commands run strictly serially; view components observe state
//! through [`events::EventBus`] and re-read after each refresh token.

pub mod cancel;
pub mod commit;
pub mod config;
pub mod diff;
pub mod error;
pub mod events;
pub mod index;
pub mod model;
pub mod odb;
pub mod op;
pub mod preview;
pub mod refs;
pub mod remote;
pub mod repo;
pub mod revision;
pub mod shell;
pub mod snapshot;
pub mod stash;
pub mod status;
pub mod tree;
pub mod worktree;

pub use error::{GitError, Result};
pub use model::Oid;
pub use repo::Repository;
