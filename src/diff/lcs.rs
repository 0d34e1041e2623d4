//! Longest-common-subsequence line diff.
//!
//! Both inputs are split on `\n` (a trailing newline therefore yields a
//! final empty element, which keeps the round-trip law exact: applying
//! the ops to the old text and re-joining with `\n` reproduces the new
//! text byte for byte).

/// One diff operation over a single line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffOp {
    /// The line is unchanged.
    Equal(String),
    /// The line exists only in the new text.
    Add(String),
    /// The line exists only in the old text.
    Del(String),
}

impl DiffOp {
    /// The line content, whichever side it came from.
    #[must_use]
    pub fn line(&self) -> &str {
        match self {
            Self::Equal(s) | Self::Add(s) | Self::Del(s) => s,
        }
    }

    /// Returns `true` for [`DiffOp::Equal`].
    #[must_use]
    pub const fn is_equal(&self) -> bool {
        matches!(self, Self::Equal(_))
    }
}

/// Diff `old` against `new`, producing an ordered op sequence.
///
/// Backtracking prefers `Del` when strictly longer down the old side and
/// `Add` otherwise, so ties resolve to `Add`.
#[must_use]
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffOp> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let n = old_lines.len();
    let m = new_lines.len();

    // dp[i][j] = LCS length of old_lines[..i] and new_lines[..j].
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if old_lines[i - 1] == new_lines[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            ops.push(DiffOp::Equal(old_lines[i - 1].to_owned()));
            i -= 1;
            j -= 1;
        } else if i > 0 && (j == 0 || dp[i - 1][j] > dp[i][j - 1]) {
            ops.push(DiffOp::Del(old_lines[i - 1].to_owned()));
            i -= 1;
        } else {
            ops.push(DiffOp::Add(new_lines[j - 1].to_owned()));
            j -= 1;
        }
    }
    ops.reverse();
    ops
}

/// Apply an op sequence to reconstruct the new text.
///
/// Used by tests to state the round-trip law; kept public because the
/// gutter revert path shares the notion of op application.
#[must_use]
pub fn apply_ops(ops: &[DiffOp]) -> String {
    let lines: Vec<&str> = ops
        .iter()
        .filter(|op| !matches!(op, DiffOp::Del(_)))
        .map(DiffOp::line)
        .collect();
    lines.join("\n")
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn lines_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec("[ab c]{0,6}", 0..12).prop_map(|v| v.join("\n"))
    }

    proptest! {
        /// Applying the ops emitted by the diff to the old text yields
        /// the new text.
        #[test]
        fn round_trip(old in lines_strategy(), new in lines_strategy()) {
            let ops = diff_lines(&old, &new);
            prop_assert_eq!(apply_ops(&ops), new);
        }

        /// Old-side lines of the op stream reproduce the old text.
        #[test]
        fn old_side_preserved(old in lines_strategy(), new in lines_strategy()) {
            let ops = diff_lines(&old, &new);
            let old_side: Vec<&str> = ops
                .iter()
                .filter(|op| !matches!(op, DiffOp::Add(_)))
                .map(DiffOp::line)
                .collect();
            prop_assert_eq!(old_side.join("\n"), old);
        }
    }
}
