//! Unified diff rendering for the terminal and the UI diff panes.
//!
//! Output shape:
//!
//! ```text
//! diff -- src/index.txt
//! --- a/src/index.txt
//! +++ b/src/index.txt
//! @@ -1,3 +1,4 @@
//!   context line
//! + added line
//! - deleted line
//! ```
//!
//! Hunks carry two lines of context. When the inputs differ but the op
//! walk produced no hunks (the pathological empty-file case) a single
//! `@@ -1,0 +1,0 @@` header is emitted.

use super::lcs::{diff_lines, DiffOp};

/// Context lines carried on each side of a hunk.
const CONTEXT: usize = 2;

/// Render a unified diff of `old` → `new` for display.
///
/// Returns `None` when the inputs are identical (no output at all).
#[must_use]
pub fn unified_diff(file: &str, old: &str, new: &str) -> Option<String> {
    if old == new {
        return None;
    }
    let ops = diff_lines(old, new);

    let mut out = String::new();
    out.push_str(&format!("diff -- {file}\n"));
    out.push_str(&format!("--- a/{file}\n"));
    out.push_str(&format!("+++ b/{file}\n"));

    let hunks = hunk_ranges(&ops);
    if hunks.is_empty() {
        out.push_str("@@ -1,0 +1,0 @@\n");
        return Some(out);
    }

    // Old/new line numbers of the next op, 1-based.
    let mut old_ln = 1usize;
    let mut new_ln = 1usize;
    let mut cursor = 0usize;
    for (start, end) in hunks {
        // Advance counters over ops before the hunk.
        for op in &ops[cursor..start] {
            match op {
                DiffOp::Equal(_) => {
                    old_ln += 1;
                    new_ln += 1;
                }
                DiffOp::Del(_) => old_ln += 1,
                DiffOp::Add(_) => new_ln += 1,
            }
        }
        cursor = start;

        let old_start = old_ln;
        let new_start = new_ln;
        let mut old_count = 0usize;
        let mut new_count = 0usize;
        let mut body = String::new();
        for op in &ops[start..end] {
            match op {
                DiffOp::Equal(line) => {
                    body.push_str(&format!("  {line}\n"));
                    old_count += 1;
                    new_count += 1;
                    old_ln += 1;
                    new_ln += 1;
                }
                DiffOp::Add(line) => {
                    body.push_str(&format!("+ {line}\n"));
                    new_count += 1;
                    new_ln += 1;
                }
                DiffOp::Del(line) => {
                    body.push_str(&format!("- {line}\n"));
                    old_count += 1;
                    old_ln += 1;
                }
            }
        }
        cursor = end;
        out.push_str(&format!(
            "@@ -{old_start},{old_count} +{new_start},{new_count} @@\n"
        ));
        out.push_str(&body);
    }
    Some(out)
}

/// Merge changed op indices (expanded by context) into hunk ranges.
fn hunk_ranges(ops: &[DiffOp]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        if op.is_equal() {
            continue;
        }
        let start = i.saturating_sub(CONTEXT);
        let end = (i + CONTEXT + 1).min(ops.len());
        match ranges.last_mut() {
            Some((_, prev_end)) if start <= *prev_end => *prev_end = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}
