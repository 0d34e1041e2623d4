//! Gutter projection: line sets and reversible change records for the
//! editor view.
//!
//! Consecutive non-equal ops group into a *run*; each run classifies as
//! `add` (only new lines), `delete` (only old lines), or `modify`
//! (both). The projection exposes three line sets plus a `line → change`
//! map; the view paints gutter marks from the sets and reverts single
//! changes through the records.

use std::collections::{BTreeMap, BTreeSet};

use super::lcs::{diff_lines, DiffOp};

/// Classification of a change run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Only new lines.
    Add,
    /// Old and new lines.
    Modify,
    /// Only old lines.
    Delete,
}

/// One reversible change run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Run classification.
    pub kind: ChangeKind,
    /// The old-side lines of the run.
    pub old_lines: Vec<String>,
    /// The new-side lines of the run.
    pub new_lines: Vec<String>,
    /// 1-based new-file line of the first added/modified line, or the
    /// insertion point for a delete.
    pub new_start: usize,
    /// Exclusive 1-based end of the run's new-file lines
    /// (`new_start` itself for a delete).
    pub new_end: usize,
    /// The gutter line the mark is drawn on, clamped into the new file.
    pub marker_line: usize,
}

/// The full gutter projection for one buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GutterDiff {
    /// New-file lines belonging to `add` runs.
    pub added_lines: BTreeSet<usize>,
    /// New-file lines belonging to `modify` runs.
    pub modified_lines: BTreeSet<usize>,
    /// Marker lines of `delete` runs.
    pub removed_markers: BTreeSet<usize>,
    /// Gutter line → change record.
    pub changes: BTreeMap<usize, ChangeRecord>,
}

impl GutterDiff {
    /// Returns `true` when the buffer matches the baseline.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Compute the projection of `new` (the live buffer) against `old`
    /// (the `HEAD` baseline).
    #[must_use]
    pub fn compute(old: &str, new: &str) -> Self {
        let ops = diff_lines(old, new);
        let new_total = new.split('\n').count();

        let mut out = Self::default();
        let mut new_ln = 1usize; // 1-based number of the next new line
        let mut run_old: Vec<String> = Vec::new();
        let mut run_new: Vec<String> = Vec::new();
        let mut run_start = 1usize;

        let mut flush =
            |out: &mut Self, run_old: &mut Vec<String>, run_new: &mut Vec<String>, start: usize| {
                if run_old.is_empty() && run_new.is_empty() {
                    return;
                }
                let kind = match (run_old.is_empty(), run_new.is_empty()) {
                    (true, false) => ChangeKind::Add,
                    (false, true) => ChangeKind::Delete,
                    _ => ChangeKind::Modify,
                };
                let new_end = start + run_new.len();
                let marker_line = start.clamp(1, new_total.max(1));
                let record = ChangeRecord {
                    kind,
                    old_lines: std::mem::take(run_old),
                    new_lines: std::mem::take(run_new),
                    new_start: start,
                    new_end,
                    marker_line,
                };
                match kind {
                    ChangeKind::Add => {
                        out.added_lines.extend(start..new_end);
                    }
                    ChangeKind::Modify => {
                        out.modified_lines.extend(start..new_end);
                    }
                    ChangeKind::Delete => {
                        out.removed_markers.insert(marker_line);
                    }
                }
                if kind == ChangeKind::Delete {
                    out.changes.insert(marker_line, record);
                } else {
                    for line in start..new_end {
                        out.changes.insert(line, record.clone());
                    }
                }
            };

        for op in ops {
            match op {
                DiffOp::Equal(_) => {
                    flush(&mut out, &mut run_old, &mut run_new, run_start);
                    new_ln += 1;
                    run_start = new_ln;
                }
                DiffOp::Add(line) => {
                    run_new.push(line);
                    new_ln += 1;
                }
                DiffOp::Del(line) => {
                    run_old.push(line);
                }
            }
        }
        flush(&mut out, &mut run_old, &mut run_new, run_start);
        out
    }

    /// The change covering gutter line `line`, if any.
    #[must_use]
    pub fn change_at(&self, line: usize) -> Option<&ChangeRecord> {
        self.changes.get(&line)
    }
}

/// Undo a single change in `buffer`, returning the reverted text.
///
/// Add/modify runs have their new-file lines
/// `[new_start-1 .. new_end-1)` (0-based) replaced with the old lines;
/// delete runs re-insert the old lines at `new_start-1`.
#[must_use]
pub fn revert_change(buffer: &str, change: &ChangeRecord) -> String {
    let mut lines: Vec<String> = buffer.split('\n').map(str::to_owned).collect();
    let start = (change.new_start - 1).min(lines.len());
    match change.kind {
        ChangeKind::Delete => {
            lines.splice(start..start, change.old_lines.iter().cloned());
        }
        ChangeKind::Add | ChangeKind::Modify => {
            let end = (change.new_end - 1).min(lines.len());
            lines.splice(start..end, change.old_lines.iter().cloned());
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_buffer_is_empty() {
        let g = GutterDiff::compute("a\nb\n", "a\nb\n");
        assert!(g.is_empty());
    }

    #[test]
    fn added_line_classified_add() {
        let g = GutterDiff::compute("a\nc", "a\nb\nc");
        assert!(g.added_lines.contains(&2));
        assert!(g.modified_lines.is_empty());
        assert!(g.removed_markers.is_empty());
        let change = g.change_at(2).unwrap();
        assert_eq!(change.kind, ChangeKind::Add);
        assert_eq!(change.new_lines, vec!["b"]);
        assert!(change.old_lines.is_empty());
    }

    #[test]
    fn modified_line_classified_modify() {
        let g = GutterDiff::compute("a\nold\nc", "a\nnew\nc");
        assert!(g.modified_lines.contains(&2));
        let change = g.change_at(2).unwrap();
        assert_eq!(change.kind, ChangeKind::Modify);
        assert_eq!(change.old_lines, vec!["old"]);
        assert_eq!(change.new_lines, vec!["new"]);
    }

    #[test]
    fn deleted_line_leaves_marker() {
        let g = GutterDiff::compute("a\nb\nc", "a\nc");
        assert_eq!(g.removed_markers.iter().copied().collect::<Vec<_>>(), vec![2]);
        let change = g.change_at(2).unwrap();
        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.old_lines, vec!["b"]);
        assert_eq!(change.new_start, change.new_end);
    }

    #[test]
    fn delete_at_end_clamps_marker() {
        let g = GutterDiff::compute("a\nb\nc", "a");
        let marker = *g.removed_markers.iter().next().unwrap();
        assert!(marker >= 1 && marker <= 1, "marker {marker} must stay in buffer");
    }

    #[test]
    fn line_sets_and_change_kinds_agree() {
        let g = GutterDiff::compute("one\ntwo\nthree\nfour", "one\nTWO\nthree\nextra\nfour");
        for line in &g.added_lines {
            assert_eq!(g.change_at(*line).unwrap().kind, ChangeKind::Add);
        }
        for line in &g.modified_lines {
            assert_eq!(g.change_at(*line).unwrap().kind, ChangeKind::Modify);
        }
        for line in &g.removed_markers {
            assert_eq!(g.change_at(*line).unwrap().kind, ChangeKind::Delete);
        }
    }

    #[test]
    fn revert_modify_restores_old_lines() {
        let old = "a\nold\nc";
        let new = "a\nnew\nc";
        let g = GutterDiff::compute(old, new);
        let change = g.change_at(2).unwrap();
        assert_eq!(revert_change(new, change), old);
    }

    #[test]
    fn revert_add_removes_lines() {
        let old = "a\nc";
        let new = "a\nb\nc";
        let g = GutterDiff::compute(old, new);
        let change = g.change_at(2).unwrap();
        assert_eq!(revert_change(new, change), old);
    }

    #[test]
    fn revert_delete_reinserts_lines() {
        let old = "a\nb\nc";
        let new = "a\nc";
        let g = GutterDiff::compute(old, new);
        let change = g.change_at(2).unwrap();
        assert_eq!(revert_change(new, change), old);
    }

    #[test]
    fn multi_line_run_shares_one_record() {
        let g = GutterDiff::compute("keep", "keep\nx\ny\nz");
        assert_eq!(g.added_lines.len(), 3);
        let a = g.change_at(2).unwrap();
        let b = g.change_at(4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.new_start, 2);
        assert_eq!(a.new_end, 5);
    }
}
