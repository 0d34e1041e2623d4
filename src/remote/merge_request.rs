//! Merge-request records and lifecycle.
//!
//! Records persist as a JSON array at `<remote-root>/.edu_git_remote.json`
//! with camelCase fields. Opening a request recomputes its relation and
//! a dry-run merge status; confirming runs the real merge on the remote
//! repository.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Identity;
use crate::diff::unified_diff;
use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::repo::{Repository, MR_FILE};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Lifecycle state of a merge request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MrStatus {
    /// Awaiting review.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into the base branch.
    Merged,
}

/// Dry-run mergeability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    /// The merge would complete without conflicts.
    Clean,
    /// The merge would conflict.
    Conflict,
}

/// How the compare branch relates to the base branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeRelation {
    /// Compare strictly ahead of base (fast-forwardable).
    #[serde(rename = "ahead")]
    Ahead,
    /// Compare strictly behind base (nothing to merge).
    #[serde(rename = "behind")]
    Behind,
    /// Tips are equal.
    #[serde(rename = "up-to-date")]
    UpToDate,
    /// Both branches have their own commits.
    #[serde(rename = "diverged")]
    Diverged,
}

/// One commit shown in the request's commit list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrCommit {
    /// Full hex oid.
    pub oid: String,
    /// First line of the message.
    pub summary: String,
}

/// Per-file status badge in a compare view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Present only in compare.
    Added,
    /// Present in both with different content.
    Modified,
    /// Present only in base.
    Deleted,
}

/// One file difference between the base and compare trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MrFileDiff {
    /// Repo-relative path.
    pub path: String,
    /// Status badge.
    pub status: FileStatus,
    /// Unified diff text (absent when content is binary-identical).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// A persisted merge-request record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// Stable identifier.
    pub id: String,
    /// Title as entered.
    pub title: String,
    /// URL-ish slug derived from the title.
    pub slug: String,
    /// Lifecycle state.
    pub status: MrStatus,
    /// The branch merged into.
    pub base: String,
    /// The branch being merged.
    pub compare: String,
    /// Commits unique to compare (recomputed on open).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commits: Option<Vec<MrCommit>>,
    /// File diffs base → compare (recomputed on open).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffs: Option<Vec<MrFileDiff>>,
    /// Dry-run mergeability (recomputed on open).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_status: Option<MergeStatus>,
    /// Paths that would conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_files: Option<Vec<String>>,
    /// Message recorded when the request was merged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_message: Option<String>,
    /// Relation of compare to base (recomputed on open).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_relation: Option<MergeRelation>,
}

/// The result of confirming a merge request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MrMergeOutcome {
    /// The base branch now contains compare; the record is `merged`.
    Merged {
        /// The new base tip.
        to: Oid,
    },
    /// The dry run found conflicts; nothing was merged.
    Conflict {
        /// The paths that would conflict.
        files: Vec<String>,
    },
}

fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_owned()
}

fn new_id() -> String {
    let mut rng = rand::rng();
    (0..8)
        .map(|_| {
            let v: u8 = rng.random_range(0..16);
            char::from_digit(u32::from(v), 16).unwrap_or('0')
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Lifecycle (methods on the remote repository)
// ---------------------------------------------------------------------------

impl Repository {
    fn mr_file_path(&self) -> String {
        self.work_path(MR_FILE)
    }

    /// Load every record (missing file means no requests).
    ///
    /// # Errors
    /// A malformed record file.
    pub fn load_merge_requests(&self) -> Result<Vec<MergeRequest>> {
        let p = self.mr_file_path();
        if !self.store().exists(&p)? {
            return Ok(Vec::new());
        }
        let raw = self.store().read_file(&p)?;
        serde_json::from_slice(&raw).map_err(|e| GitError::CorruptObject {
            oid: MR_FILE.to_owned(),
            detail: e.to_string(),
        })
    }

    /// Persist the full record list.
    ///
    /// # Errors
    /// Filesystem and serialisation failures.
    pub fn save_merge_requests(&self, requests: &[MergeRequest]) -> Result<()> {
        let json = serde_json::to_vec_pretty(requests).map_err(|e| GitError::CorruptObject {
            oid: MR_FILE.to_owned(),
            detail: e.to_string(),
        })?;
        self.store().write_file_all(&self.mr_file_path(), &json)?;
        Ok(())
    }

    /// Open a new merge request `compare → base`.
    ///
    /// # Errors
    /// [`GitError::NameExists`] when the same `{base, compare}` pair is
    /// already open; [`GitError::InvalidRef`] for unknown branches.
    pub fn create_merge_request(
        &self,
        title: &str,
        base: &str,
        compare: &str,
    ) -> Result<MergeRequest> {
        self.resolve_ref(&format!("refs/heads/{base}"))?;
        self.resolve_ref(&format!("refs/heads/{compare}"))?;

        let mut requests = self.load_merge_requests()?;
        if requests
            .iter()
            .any(|r| r.status == MrStatus::Open && r.base == base && r.compare == compare)
        {
            return Err(GitError::NameExists {
                name: format!("{compare} -> {base}"),
            });
        }
        let id = new_id();
        let request = MergeRequest {
            id: id.clone(),
            title: title.to_owned(),
            slug: slugify(title),
            status: MrStatus::Open,
            base: base.to_owned(),
            compare: compare.to_owned(),
            commits: None,
            diffs: None,
            merge_status: None,
            conflict_files: None,
            merge_message: None,
            merge_relation: None,
        };
        requests.push(request.clone());
        self.save_merge_requests(&requests)?;
        info!(id, base, compare, "merge request created");
        Ok(request)
    }

    /// Relation of `compare`'s tip to `base`'s tip.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for unknown branches.
    pub fn branch_relation(&self, base: &str, compare: &str) -> Result<MergeRelation> {
        let base_tip = self.resolve_ref(&format!("refs/heads/{base}"))?;
        let compare_tip = self.resolve_ref(&format!("refs/heads/{compare}"))?;
        if base_tip == compare_tip {
            return Ok(MergeRelation::UpToDate);
        }
        if self.is_descendent(compare_tip, base_tip)? {
            return Ok(MergeRelation::Ahead);
        }
        if self.is_descendent(base_tip, compare_tip)? {
            return Ok(MergeRelation::Behind);
        }
        Ok(MergeRelation::Diverged)
    }

    /// File diffs between two branch tips (`base → compare`), sorted by
    /// path, each with its status badge and unified diff text.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for unknown branches.
    pub fn compare_branches(&self, base: &str, compare: &str) -> Result<Vec<MrFileDiff>> {
        let base_tip = self.resolve_ref(&format!("refs/heads/{base}"))?;
        let compare_tip = self.resolve_ref(&format!("refs/heads/{compare}"))?;
        let base_blobs = self.flatten_commit(Some(base_tip))?;
        let compare_blobs = self.flatten_commit(Some(compare_tip))?;

        let mut paths: std::collections::BTreeSet<&String> = std::collections::BTreeSet::new();
        paths.extend(base_blobs.keys());
        paths.extend(compare_blobs.keys());

        let mut diffs = Vec::new();
        for path in paths {
            let b = base_blobs.get(path).copied();
            let c = compare_blobs.get(path).copied();
            if b == c {
                continue;
            }
            let status = match (b, c) {
                (None, Some(_)) => FileStatus::Added,
                (Some(_), None) => FileStatus::Deleted,
                _ => FileStatus::Modified,
            };
            let old = self.blob_text(b)?;
            let new = self.blob_text(c)?;
            diffs.push(MrFileDiff {
                path: path.clone(),
                status,
                diff: unified_diff(path, &old, &new),
            });
        }
        Ok(diffs)
    }

    /// Open (view) a request: recompute relation, dry-run merge status,
    /// commit list, and file diffs; persist and return the refreshed
    /// record.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for an unknown id or vanished branches.
    pub fn merge_request_detail(&self, id: &str) -> Result<MergeRequest> {
        let mut requests = self.load_merge_requests()?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GitError::InvalidRef {
                name: id.to_owned(),
            })?;

        if request.status == MrStatus::Open {
            let base_tip = self.resolve_ref(&format!("refs/heads/{}", request.base))?;
            let compare_tip = self.resolve_ref(&format!("refs/heads/{}", request.compare))?;

            request.merge_relation =
                Some(self.branch_relation(&request.base, &request.compare)?);

            let analysis = self.merge_analysis(base_tip, compare_tip)?;
            request.merge_status = Some(if analysis.clean {
                MergeStatus::Clean
            } else {
                MergeStatus::Conflict
            });
            request.conflict_files = if analysis.conflict_files.is_empty() {
                None
            } else {
                Some(analysis.conflict_files)
            };

            let base_history: std::collections::BTreeSet<Oid> =
                self.log(base_tip)?.into_iter().map(|e| e.oid).collect();
            request.commits = Some(
                self.log(compare_tip)?
                    .into_iter()
                    .filter(|e| !base_history.contains(&e.oid))
                    .map(|e| MrCommit {
                        oid: e.oid.to_hex(),
                        summary: e.commit.summary().to_owned(),
                    })
                    .collect(),
            );
            request.diffs = Some(self.compare_branches(&request.base, &request.compare)?);
        }

        let snapshot = request.clone();
        self.save_merge_requests(&requests)?;
        Ok(snapshot)
    }

    /// Confirm a request: run the real merge on this (remote)
    /// repository, mark the record `merged`, and optionally delete the
    /// compare branch.
    ///
    /// # Errors
    /// [`GitError::InvalidRef`] for an unknown id or non-open request.
    pub fn merge_merge_request(
        &self,
        id: &str,
        delete_branch_on_merge: bool,
        identity: &Identity,
    ) -> Result<MrMergeOutcome> {
        let mut requests = self.load_merge_requests()?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id && r.status == MrStatus::Open)
            .ok_or_else(|| GitError::InvalidRef {
                name: id.to_owned(),
            })?;

        let base_ref = format!("refs/heads/{}", request.base);
        let base_tip = self.resolve_ref(&base_ref)?;
        let compare_tip = self.resolve_ref(&format!("refs/heads/{}", request.compare))?;

        let analysis = self.merge_analysis(base_tip, compare_tip)?;
        if !analysis.clean {
            request.merge_status = Some(MergeStatus::Conflict);
            request.conflict_files = Some(analysis.conflict_files.clone());
            self.save_merge_requests(&requests)?;
            return Ok(MrMergeOutcome::Conflict {
                files: analysis.conflict_files,
            });
        }

        let message = format!(
            "Merge branch '{}' into {}",
            request.compare, request.base
        );
        let new_tip = if base_tip == compare_tip
            || self.is_descendent(base_tip, compare_tip)?
        {
            base_tip // nothing to do
        } else if self.is_descendent(compare_tip, base_tip)? {
            self.write_ref(&base_ref, compare_tip, true)?;
            compare_tip
        } else {
            let merged_tree = self.merged_tree(base_tip, compare_tip)?;
            let sig = crate::model::Signature {
                name: identity.name.clone(),
                email: identity.email.clone(),
                timestamp: crate::commit::now_secs(),
            };
            let commit = crate::model::Commit {
                tree: merged_tree,
                parents: vec![base_tip, compare_tip],
                author: sig.clone(),
                committer: sig,
                message: message.clone(),
            };
            let oid = self.write_object(&crate::model::Object::Commit(commit))?;
            self.write_ref(&base_ref, oid, true)?;
            oid
        };

        // Keep the remote's working tree in step when base is checked out.
        if self.current_branch()?.as_deref() == Some(request.base.as_str()) {
            self.reset_worktree_and_index(&self.flatten_commit(Some(new_tip))?)?;
        }

        request.status = MrStatus::Merged;
        request.merge_status = Some(MergeStatus::Clean);
        request.merge_message = Some(message);
        let compare = request.compare.clone();
        let base = request.base.clone();
        self.save_merge_requests(&requests)?;

        if delete_branch_on_merge && compare != base {
            self.delete_ref(&format!("refs/heads/{compare}"))?;
        }
        info!(id, to = %new_tip.short(), "merge request merged");
        Ok(MrMergeOutcome::Merged { to: new_tip })
    }

    /// Build the clean merged tree of two tips without touching any
    /// working tree. Only valid when the dry run reported clean.
    fn merged_tree(&self, ours: Oid, theirs: Oid) -> Result<Oid> {
        let base = self.merge_base(ours, theirs)?;
        let base_blobs = self.flatten_commit(base)?;
        let our_blobs = self.flatten_commit(Some(ours))?;
        let their_blobs = self.flatten_commit(Some(theirs))?;

        let mut paths: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        paths.extend(base_blobs.keys().cloned());
        paths.extend(our_blobs.keys().cloned());
        paths.extend(their_blobs.keys().cloned());

        let mut merged = std::collections::BTreeMap::new();
        for path in paths {
            let b = base_blobs.get(&path).copied();
            let o = our_blobs.get(&path).copied();
            let t = their_blobs.get(&path).copied();
            let keep = if o == t || b == t {
                o
            } else if b == o {
                t
            } else {
                let text = crate::diff::merge_text(
                    &self.blob_text(b)?,
                    &self.blob_text(o)?,
                    &self.blob_text(t)?,
                    "ours",
                    "theirs",
                );
                Some(self.write_blob(text.text.as_bytes())?)
            };
            if let Some(oid) = keep {
                merged.insert(path, oid);
            }
        }
        self.build_tree(&merged)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use edugit_fs::{FileStore, MemStore};

    use super::*;
    use crate::remote::protocol::create_remote;
    use crate::worktree::CheckoutOpts;

    fn remote() -> (Arc<dyn FileStore>, Repository) {
        let store: Arc<dyn FileStore> = Arc::new(MemStore::new());
        let repo = create_remote(&store, "origin", "main").unwrap();
        (store, repo)
    }

    fn commit_file(repo: &Repository, rel: &str, content: &str, msg: &str) -> Oid {
        repo.store()
            .write_file_all(&repo.work_path(rel), content.as_bytes())
            .unwrap();
        repo.add(".").unwrap();
        repo.commit(Some(msg), &Identity::default())
            .unwrap()
            .oid()
            .expect("commit created")
    }

    /// `feature` one commit ahead of `main`.
    fn ahead_fixture(repo: &Repository) -> (Oid, Oid) {
        let base = commit_file(repo, "base.txt", "base\n", "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        let tip = commit_file(repo, "feature.txt", "feature\n", "feature work");
        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        (base, tip)
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Add login page"), "add-login-page");
        assert_eq!(slugify("  Fix: bug #42!  "), "fix-bug-42");
        assert_eq!(slugify("UPPER"), "upper");
    }

    #[test]
    fn create_persists_open_record() {
        let (s, repo) = remote();
        ahead_fixture(&repo);
        let mr = repo
            .create_merge_request("Add feature", "main", "feature")
            .unwrap();
        assert_eq!(mr.status, MrStatus::Open);
        assert_eq!(mr.slug, "add-feature");
        assert!(s.exists("/.remotes/origin/.edu_git_remote.json").unwrap());
        let loaded = repo.load_merge_requests().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, mr.id);
    }

    #[test]
    fn duplicate_open_pair_rejected() {
        let (_s, repo) = remote();
        ahead_fixture(&repo);
        repo.create_merge_request("One", "main", "feature").unwrap();
        let err = repo
            .create_merge_request("Two", "main", "feature")
            .unwrap_err();
        assert!(matches!(err, GitError::NameExists { .. }));
    }

    #[test]
    fn detail_reports_ahead_and_clean() {
        let (_s, repo) = remote();
        let (_base, tip) = ahead_fixture(&repo);
        let mr = repo
            .create_merge_request("Add feature", "main", "feature")
            .unwrap();
        let detail = repo.merge_request_detail(&mr.id).unwrap();
        assert_eq!(detail.merge_relation, Some(MergeRelation::Ahead));
        assert_eq!(detail.merge_status, Some(MergeStatus::Clean));
        let commits = detail.commits.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].oid, tip.to_hex());
        assert_eq!(commits[0].summary, "feature work");
        let diffs = detail.diffs.unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path, "feature.txt");
        assert_eq!(diffs[0].status, FileStatus::Added);
    }

    #[test]
    fn detail_reports_conflict() {
        let (_s, repo) = remote();
        let base = commit_file(&repo, "f.txt", "base\n", "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        commit_file(&repo, "f.txt", "feature\n", "feature");
        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        commit_file(&repo, "f.txt", "main\n", "main");

        let mr = repo.create_merge_request("Risky", "main", "feature").unwrap();
        let detail = repo.merge_request_detail(&mr.id).unwrap();
        assert_eq!(detail.merge_relation, Some(MergeRelation::Diverged));
        assert_eq!(detail.merge_status, Some(MergeStatus::Conflict));
        assert_eq!(detail.conflict_files, Some(vec!["f.txt".to_owned()]));
    }

    #[test]
    fn confirm_fast_forwards_and_deletes_branch() {
        let (_s, repo) = remote();
        let (_base, tip) = ahead_fixture(&repo);
        let mr = repo
            .create_merge_request("Add feature", "main", "feature")
            .unwrap();
        let outcome = repo
            .merge_merge_request(&mr.id, true, &Identity::default())
            .unwrap();
        assert_eq!(outcome, MrMergeOutcome::Merged { to: tip });
        assert_eq!(repo.read_ref("refs/heads/main").unwrap(), Some(tip));
        assert_eq!(repo.read_ref("refs/heads/feature").unwrap(), None);
        let records = repo.load_merge_requests().unwrap();
        assert_eq!(records[0].status, MrStatus::Merged);
        assert!(records[0].merge_message.is_some());
        // Base is checked out on the remote: worktree follows.
        assert!(repo.store().exists("/.remotes/origin/feature.txt").unwrap());
    }

    #[test]
    fn confirm_divergent_creates_merge_commit() {
        let (_s, repo) = remote();
        let base = commit_file(&repo, "base.txt", "base\n", "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        let feature_tip = commit_file(&repo, "feature.txt", "f\n", "feature");
        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        let main_tip = commit_file(&repo, "main.txt", "m\n", "main");

        let mr = repo.create_merge_request("Merge it", "main", "feature").unwrap();
        let outcome = repo
            .merge_merge_request(&mr.id, false, &Identity::default())
            .unwrap();
        let MrMergeOutcome::Merged { to } = outcome else {
            panic!("expected merge");
        };
        let commit = repo.read_commit(to).unwrap();
        assert_eq!(commit.parents, vec![main_tip, feature_tip]);
        // Both files in the merged tree.
        let blobs = repo.flatten_commit(Some(to)).unwrap();
        assert!(blobs.contains_key("feature.txt"));
        assert!(blobs.contains_key("main.txt"));
        // Branch survived (delete flag off).
        assert!(repo.read_ref("refs/heads/feature").unwrap().is_some());
    }

    #[test]
    fn confirm_conflicted_request_refuses() {
        let (_s, repo) = remote();
        let base = commit_file(&repo, "f.txt", "base\n", "base");
        repo.write_ref("refs/heads/feature", base, false).unwrap();
        repo.checkout(&CheckoutOpts::branch("feature")).unwrap();
        commit_file(&repo, "f.txt", "feature\n", "feature");
        repo.checkout(&CheckoutOpts::branch("main")).unwrap();
        let main_tip = commit_file(&repo, "f.txt", "main\n", "main");

        let mr = repo.create_merge_request("Bad", "main", "feature").unwrap();
        let outcome = repo
            .merge_merge_request(&mr.id, false, &Identity::default())
            .unwrap();
        assert_eq!(
            outcome,
            MrMergeOutcome::Conflict {
                files: vec!["f.txt".to_owned()]
            }
        );
        // Nothing moved, record still open with conflict status.
        assert_eq!(repo.read_ref("refs/heads/main").unwrap(), Some(main_tip));
        let records = repo.load_merge_requests().unwrap();
        assert_eq!(records[0].status, MrStatus::Open);
        assert_eq!(records[0].merge_status, Some(MergeStatus::Conflict));
    }

    #[test]
    fn record_serde_uses_camel_case_and_kebab_relation() {
        let mr = MergeRequest {
            id: "abcd1234".to_owned(),
            title: "T".to_owned(),
            slug: "t".to_owned(),
            status: MrStatus::Open,
            base: "main".to_owned(),
            compare: "feature".to_owned(),
            commits: None,
            diffs: None,
            merge_status: Some(MergeStatus::Clean),
            conflict_files: None,
            merge_message: None,
            merge_relation: Some(MergeRelation::UpToDate),
        };
        let json = serde_json::to_string(&mr).unwrap();
        assert!(json.contains("\"mergeStatus\":\"clean\""));
        assert!(json.contains("\"mergeRelation\":\"up-to-date\""));
        assert!(!json.contains("commits"));
        let back: MergeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mr);
    }
}
