//! The line-diff engine: LCS diff, unified rendering, gutter
//! projection, and three-way (diff3) content merge.

pub mod gutter;
pub mod lcs;
pub mod merge3;
pub mod unified;

pub use gutter::{ChangeKind, ChangeRecord, GutterDiff};
pub use lcs::{diff_lines, DiffOp};
pub use merge3::{merge_text, MergedText};
pub use unified::unified_diff;
