//! Revision resolution and history traversal.
//!
//! `resolve_commitish` layers `~N` / `^[n]` suffix parsing on top of
//! [`Repository::resolve_ref`]; `log`, `merge_base`, and
//! `is_descendent` walk the commit graph.

use std::collections::{BTreeSet, VecDeque};

use crate::error::{GitError, Result};
use crate::model::{Commit, Oid};
use crate::repo::Repository;

/// One history entry from [`Repository::log`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// The commit's oid.
    pub oid: Oid,
    /// The decoded commit.
    pub commit: Commit,
}

impl Repository {
    /// Resolve a commitish expression: a refish with optional `~N` and
    /// `^[n]` suffixes (`main~2`, `HEAD^`, `abc1234^2~1`).
    ///
    /// `~N` walks `N` first parents; `^[n]` selects parent `n`
    /// (1-based, default 1).
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] when the base ref or any step fails to
    /// resolve.
    pub fn resolve_commitish(&self, expr: &str) -> Result<Oid> {
        let split = expr
            .find(['~', '^'])
            .map_or((expr, ""), |i| expr.split_at(i));
        let (base, suffix) = split;
        if base.is_empty() {
            return Err(GitError::InvalidRef {
                name: expr.to_owned(),
            });
        }
        let mut oid = self.resolve_ref(base)?;

        let invalid = || GitError::InvalidRef {
            name: expr.to_owned(),
        };
        let mut chars = suffix.chars().peekable();
        while let Some(op) = chars.next() {
            let mut digits = String::new();
            while let Some(c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(*c);
                    chars.next();
                } else {
                    break;
                }
            }
            match op {
                '~' => {
                    let n: usize = if digits.is_empty() {
                        1
                    } else {
                        digits.parse().map_err(|_| invalid())?
                    };
                    for _ in 0..n {
                        let commit = self.read_commit(oid).map_err(|_| invalid())?;
                        oid = *commit.parents.first().ok_or_else(invalid)?;
                    }
                }
                '^' => {
                    let n: usize = if digits.is_empty() {
                        1
                    } else {
                        digits.parse().map_err(|_| invalid())?
                    };
                    let commit = self.read_commit(oid).map_err(|_| invalid())?;
                    oid = *commit
                        .parents
                        .get(n.checked_sub(1).ok_or_else(invalid)?)
                        .ok_or_else(invalid)?;
                }
                _ => return Err(invalid()),
            }
        }
        Ok(oid)
    }

    /// History of `start`, newest first: depth-first preferring first
    /// parents, deduplicated by oid.
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn log(&self, start: Oid) -> Result<Vec<LogEntry>> {
        let mut seen: BTreeSet<Oid> = BTreeSet::new();
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(oid) = stack.pop() {
            if !seen.insert(oid) {
                continue;
            }
            let commit = self.read_commit(oid)?;
            // Parents pushed in reverse so the first parent pops first.
            for parent in commit.parents.iter().rev() {
                stack.push(*parent);
            }
            out.push(LogEntry { oid, commit });
        }
        Ok(out)
    }

    /// Returns `true` when `ancestor` is reachable from `oid`
    /// (including `oid == ancestor`).
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn is_descendent(&self, oid: Oid, ancestor: Oid) -> Result<bool> {
        let mut seen: BTreeSet<Oid> = BTreeSet::new();
        let mut frontier = VecDeque::from([oid]);
        while let Some(cur) = frontier.pop_front() {
            if cur == ancestor {
                return Ok(true);
            }
            if !seen.insert(cur) {
                continue;
            }
            for parent in self.read_commit(cur)?.parents {
                frontier.push_back(parent);
            }
        }
        Ok(false)
    }

    /// The most recent common ancestor of `a` and `b`, or `None` when
    /// the histories are disjoint.
    ///
    /// Ancestors of `a` are collected into a set; `b`'s ancestry is then
    /// walked breadth-first and the first member of the set wins.
    ///
    /// # Errors
    /// Missing or corrupt objects.
    pub fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>> {
        let mut a_set: BTreeSet<Oid> = BTreeSet::new();
        let mut frontier = VecDeque::from([a]);
        while let Some(cur) = frontier.pop_front() {
            if !a_set.insert(cur) {
                continue;
            }
            for parent in self.read_commit(cur)?.parents {
                frontier.push_back(parent);
            }
        }

        let mut seen: BTreeSet<Oid> = BTreeSet::new();
        let mut frontier = VecDeque::from([b]);
        while let Some(cur) = frontier.pop_front() {
            if a_set.contains(&cur) {
                return Ok(Some(cur));
            }
            if !seen.insert(cur) {
                continue;
            }
            for parent in self.read_commit(cur)?.parents {
                frontier.push_back(parent);
            }
        }
        Ok(None)
    }
}
