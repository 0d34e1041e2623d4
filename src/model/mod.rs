//! Core data model: object ids and the three object variants.

pub mod object;
pub mod types;

pub use object::{Commit, Object, ObjectKind, Signature, TreeEntry};
pub use types::Oid;
