//! Workspace export/import: a full workspace (repo, remote, merge
//! request, open editor state) survives the JSON round trip.

mod common;

use std::sync::Arc;

use edugit::config::{Config, Identity};
use edugit::remote::protocol::create_remote;
use edugit::shell::Shell;
use edugit::snapshot::{Snapshot, UiState, Workspace};
use edugit::worktree::CheckoutOpts;
use edugit::Repository;
use edugit_fs::MemStore;

fn populated_workspace() -> Workspace {
    let mem = Arc::new(MemStore::new());
    let ws = Workspace::new(Arc::clone(&mem));
    let mut sh = Shell::new(ws.store(), Config::default());

    common::run(&mut sh, "git init");
    common::write(&sh, "/src/app.txt", "line one\nline two\n");
    common::run(&mut sh, "git add .");
    common::run(&mut sh, "git commit -m \"seed\"");
    common::write(&sh, "/src/app.txt", "line one\nline two\nlocal\n");

    let remote = create_remote(&ws.store(), "origin", "main").unwrap();
    remote
        .store()
        .write_file_all(&remote.work_path("remote.txt"), b"remote\n")
        .unwrap();
    remote.add(".").unwrap();
    remote.commit(Some("remote seed"), &Identity::default()).unwrap();
    let tip = remote.head_oid().unwrap().unwrap();
    remote.write_ref("refs/heads/feature", tip, false).unwrap();
    remote.checkout(&CheckoutOpts::branch("feature")).unwrap();
    remote
        .store()
        .write_file_all(&remote.work_path("remote.txt"), b"remote v2\n")
        .unwrap();
    remote.add(".").unwrap();
    remote
        .commit(Some("feature work"), &Identity::default())
        .unwrap();
    remote.checkout(&CheckoutOpts::branch("main")).unwrap();
    remote
        .create_merge_request("Feature work", "main", "feature")
        .unwrap();
    ws
}

#[test]
fn full_workspace_survives_roundtrip() {
    let ws = populated_workspace();
    let ui = UiState {
        selected_file_path: Some("/src/app.txt".to_owned()),
        open_file_paths: vec!["/src/app.txt".to_owned()],
    };
    let snapshot = ws.export(ui, 1_722_470_400).unwrap();
    assert_eq!(snapshot.merge_requests.len(), 1);

    let json = serde_json::to_string_pretty(&snapshot).unwrap();
    let parsed: Snapshot = serde_json::from_str(&json).unwrap();

    let fresh = Workspace::new(Arc::new(MemStore::new()));
    fresh.import(&parsed).unwrap();

    // Local repository state is intact, uncommitted edit included.
    let repo = Repository::discover(fresh.store(), "/").unwrap();
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("main"));
    let report = repo.status_report().unwrap();
    assert_eq!(report.unstaged_modified, vec!["src/app.txt"]);

    // History survives object-for-object.
    let head = repo.head_oid().unwrap().unwrap();
    assert_eq!(repo.read_commit(head).unwrap().message, "seed");

    // The remote, its branches, and the record file survive.
    let remote = Repository::open(fresh.store(), "/.remotes/origin").unwrap();
    assert!(remote.read_ref("refs/heads/feature").unwrap().is_some());
    let records = remote.load_merge_requests().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Feature work");

    // The restored request still evaluates.
    let detail = remote.merge_request_detail(&records[0].id).unwrap();
    assert_eq!(
        detail.merge_relation,
        Some(edugit::remote::merge_request::MergeRelation::Ahead)
    );
}

#[test]
fn import_replaces_existing_workspace() {
    let ws = populated_workspace();
    let snapshot = ws.export(UiState::default(), 0).unwrap();

    let other = Workspace::new(Arc::new(MemStore::new()));
    other
        .store()
        .write_file_all("/stale/junk.txt", b"old world")
        .unwrap();
    other.import(&snapshot).unwrap();
    assert_eq!(other.store().stat("/stale/junk.txt").unwrap(), None);
    assert!(other.store().exists("/src/app.txt").unwrap());
}
