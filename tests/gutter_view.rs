//! Gutter projection scenarios: classification of live edits against
//! the HEAD baseline, refresh-token driven recomputation, and
//! single-change revert.

mod common;

use std::sync::Arc;

use common::{diff_workspace, read, run, write};
use edugit::diff::{gutter::revert_change, ChangeKind};
use edugit::Repository;

#[test]
fn add_modify_delete_classification() {
    let sh = diff_workspace();
    let repo = Repository::discover(Arc::clone(sh.store()), "/").unwrap();

    // src/index.txt gained a line.
    let g = repo
        .gutter_diff("src/index.txt", &read(&sh, "/src/index.txt"))
        .unwrap();
    assert_eq!(g.added_lines.iter().copied().collect::<Vec<_>>(), vec![2]);
    assert_eq!(g.change_at(2).unwrap().kind, ChangeKind::Add);

    // docs/overview.txt line 1 was rewritten.
    let g = repo
        .gutter_diff("docs/overview.txt", &read(&sh, "/docs/overview.txt"))
        .unwrap();
    assert!(g.modified_lines.contains(&1));
    assert_eq!(g.change_at(1).unwrap().kind, ChangeKind::Modify);

    // notes/ideas.txt lost its second line.
    let g = repo
        .gutter_diff("notes/ideas.txt", &read(&sh, "/notes/ideas.txt"))
        .unwrap();
    assert_eq!(g.removed_markers.len(), 1);
    let marker = *g.removed_markers.iter().next().unwrap();
    assert_eq!(g.change_at(marker).unwrap().kind, ChangeKind::Delete);
    assert_eq!(g.change_at(marker).unwrap().old_lines, vec!["Second idea"]);
}

#[test]
fn line_sets_match_change_kinds() {
    let sh = diff_workspace();
    let repo = Repository::discover(Arc::clone(sh.store()), "/").unwrap();
    for rel in ["src/index.txt", "docs/overview.txt", "notes/ideas.txt"] {
        let buffer = read(&sh, &format!("/{rel}"));
        let g = repo.gutter_diff(rel, &buffer).unwrap();
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
}

#[test]
fn reverting_each_change_restores_baseline() {
    let sh = diff_workspace();
    let repo = Repository::discover(Arc::clone(sh.store()), "/").unwrap();
    for rel in ["src/index.txt", "docs/overview.txt", "notes/ideas.txt"] {
        let buffer = read(&sh, &format!("/{rel}"));
        let baseline = repo.head_file_text(rel).unwrap().expect("tracked file");
        let g = repo.gutter_diff(rel, &buffer).unwrap();
        let change = g.changes.values().next().expect("one change").clone();
        let reverted = revert_change(&buffer, &change);
        assert_eq!(reverted, baseline, "revert of {rel} diverged");
    }
}

#[test]
fn commands_bump_refresh_token_for_recomputation() {
    let mut sh = diff_workspace();
    let token_before = sh.events().refresh_token();

    // A mutating command invalidates cached projections.
    run(&mut sh, "git add .");
    let token_after = sh.events().refresh_token();
    assert!(token_after > token_before);

    // Committing clears the gutter: buffer now equals HEAD.
    run(&mut sh, "git commit -m \"take local edits\"");
    let repo = Repository::discover(Arc::clone(sh.store()), "/").unwrap();
    let g = repo
        .gutter_diff("src/index.txt", &read(&sh, "/src/index.txt"))
        .unwrap();
    assert!(g.is_empty());
}

#[test]
fn editing_buffer_without_saving_still_projects() {
    let sh = diff_workspace();
    let repo = Repository::discover(Arc::clone(sh.store()), "/").unwrap();
    // The view diffs the live buffer, not the saved file.
    write(&sh, "/src/index.txt", "Start line\n");
    let g = repo
        .gutter_diff("src/index.txt", "Start line\nunsaved line\n")
        .unwrap();
    assert_eq!(g.added_lines.len(), 1);
}
