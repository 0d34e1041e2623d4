//! Three-way (diff3) content merge.
//!
//! Inputs are the base, ours, and theirs texts, tokenised by line (the
//! final token keeps no terminator when the text does not end with a
//! newline). Stable regions are the intersection of the base↔ours and
//! base↔theirs matchings; each divergent region resolves by the classic
//! rules, falling back to conflict markers when both sides changed the
//! same region differently.
//!
//! The output is always total: a conflicted merge still produces the
//! full text with markers, flagged `clean = false`.

use std::collections::BTreeMap;

/// The result of a three-way merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedText {
    /// The merged (possibly conflict-marked) content.
    pub text: String,
    /// `false` when any region required conflict markers.
    pub clean: bool,
}

/// Merge `ours` and `theirs` against their common `base`.
///
/// `label_ours` / `label_theirs` name the sides inside conflict markers
/// (typically `HEAD` and the merged ref).
#[must_use]
pub fn merge_text(
    base: &str,
    ours: &str,
    theirs: &str,
    label_ours: &str,
    label_theirs: &str,
) -> MergedText {
    let base_toks = tokenize(base);
    let our_toks = tokenize(ours);
    let their_toks = tokenize(theirs);

    let ours_match: BTreeMap<usize, usize> =
        lcs_pairs(&base_toks, &our_toks).into_iter().collect();
    let theirs_match: BTreeMap<usize, usize> =
        lcs_pairs(&base_toks, &their_toks).into_iter().collect();

    let mut out = String::new();
    let mut clean = true;
    let (mut b, mut o, mut t) = (0usize, 0usize, 0usize);

    let mut resolve = |out: &mut String,
                       clean: &mut bool,
                       bs: &[&str],
                       os: &[&str],
                       ts: &[&str]| {
        if os.is_empty() && ts.is_empty() && bs.is_empty() {
            return;
        }
        if os == bs {
            out.push_str(&ts.concat());
        } else if ts == bs || os == ts {
            out.push_str(&os.concat());
        } else {
            *clean = false;
            out.push_str(&format!("<<<<<<< {label_ours}\n"));
            out.push_str(&os.concat());
            out.push_str("=======\n");
            out.push_str(&ts.concat());
            out.push_str(&format!(">>>>>>> {label_theirs}\n"));
        }
    };

    for (&bi, &oi) in &ours_match {
        let Some(&ti) = theirs_match.get(&bi) else {
            continue;
        };
        // A matched token can only be stable when the cursors have not
        // already run past one of its sides.
        if oi < o || ti < t || bi < b {
            continue;
        }
        resolve(
            &mut out,
            &mut clean,
            &base_toks[b..bi],
            &our_toks[o..oi],
            &their_toks[t..ti],
        );
        out.push_str(base_toks[bi]);
        b = bi + 1;
        o = oi + 1;
        t = ti + 1;
    }
    resolve(
        &mut out,
        &mut clean,
        &base_toks[b..],
        &our_toks[o..],
        &their_toks[t..],
    );

    MergedText { text: out, clean }
}

/// Split into "line or trailing partial line" tokens.
fn tokenize(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// The matched index pairs of the longest common subsequence of `a`
/// and `b`, ascending on both sides.
fn lcs_pairs(a: &[&str], b: &[&str]) -> Vec<(usize, usize)> {
    let n = a.len();
    let m = b.len();
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    let mut pairs = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            pairs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    pairs.reverse();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(base: &str, ours: &str, theirs: &str) -> MergedText {
        merge_text(base, ours, theirs, "HEAD", "theirs")
    }

    #[test]
    fn unchanged_ours_takes_theirs() {
        let m = merge("a\nb\nc\n", "a\nb\nc\n", "a\nX\nc\n");
        assert!(m.clean);
        assert_eq!(m.text, "a\nX\nc\n");
    }

    #[test]
    fn unchanged_theirs_takes_ours() {
        let m = merge("a\nb\nc\n", "a\nY\nc\n", "a\nb\nc\n");
        assert!(m.clean);
        assert_eq!(m.text, "a\nY\nc\n");
    }

    #[test]
    fn same_change_both_sides_is_clean() {
        let m = merge("a\nb\nc\n", "a\nZ\nc\n", "a\nZ\nc\n");
        assert!(m.clean);
        assert_eq!(m.text, "a\nZ\nc\n");
    }

    #[test]
    fn non_overlapping_changes_combine() {
        let m = merge("a\nb\nc\nd\n", "A\nb\nc\nd\n", "a\nb\nc\nD\n");
        assert!(m.clean);
        assert_eq!(m.text, "A\nb\nc\nD\n");
    }

    #[test]
    fn overlapping_changes_conflict() {
        let m = merge("a\nb\nc\n", "a\nours\nc\n", "a\ntheirs\nc\n");
        assert!(!m.clean);
        assert_eq!(
            m.text,
            "a\n<<<<<<< HEAD\nours\n=======\ntheirs\n>>>>>>> theirs\nc\n"
        );
    }

    #[test]
    fn merge_laws() {
        // merge(base, ours, ours) = ours
        let m = merge("base\n", "edit\n", "edit\n");
        assert!(m.clean);
        assert_eq!(m.text, "edit\n");
        // merge(base, ours, base) = ours
        let m = merge("base\n", "edit\n", "base\n");
        assert!(m.clean);
        assert_eq!(m.text, "edit\n");
        // merge(base, base, theirs) = theirs
        let m = merge("base\n", "base\n", "their edit\n");
        assert!(m.clean);
        assert_eq!(m.text, "their edit\n");
    }

    #[test]
    fn deletion_against_unchanged_side_wins() {
        let m = merge("a\nb\nc\n", "a\nc\n", "a\nb\nc\n");
        assert!(m.clean);
        assert_eq!(m.text, "a\nc\n");
    }

    #[test]
    fn delete_versus_edit_conflicts() {
        let m = merge("a\nb\nc\n", "a\nc\n", "a\nB!\nc\n");
        assert!(!m.clean);
        assert!(m.text.contains("<<<<<<< HEAD"));
        assert!(m.text.contains("B!"));
    }

    #[test]
    fn empty_theirs_deletes_everything_when_ours_unchanged() {
        let m = merge("a\nb\n", "a\nb\n", "");
        assert!(m.clean);
        assert_eq!(m.text, "");
    }

    #[test]
    fn both_added_different_content_conflicts() {
        let m = merge("", "mine\n", "yours\n");
        assert!(!m.clean);
        assert!(m.text.contains("mine\n"));
        assert!(m.text.contains("yours\n"));
        assert!(m.text.contains("======="));
    }

    #[test]
    fn trailing_partial_line_is_one_token() {
        let m = merge("a\nend", "a\nend", "a\nEND");
        assert!(m.clean);
        assert_eq!(m.text, "a\nEND");
    }

    #[test]
    fn output_always_total_under_conflict() {
        let m = merge("1\n2\n3\n", "1\nX\n3\n", "1\nY\n3\n");
        assert!(!m.clean);
        assert!(m.text.starts_with("1\n"));
        assert!(m.text.ends_with("3\n"));
    }
}
