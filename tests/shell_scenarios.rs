//! End-to-end terminal scenarios: init/status, diff output, the
//! cherry-pick conflict loop, and a full rebase through the shell.

mod common;

use common::{conflict_workspace, diff_workspace, read, run, run_all, shell, write};

#[test]
fn clean_init_and_status() {
    let mut sh = shell();
    run(&mut sh, "git init");
    run(&mut sh, "mkdir /src");
    run(&mut sh, "touch /src/index.txt");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"init\"");

    let out = run(&mut sh, "git status");
    assert_eq!(out[0], "On branch main");
    assert!(
        out.contains(&"nothing to commit, working tree clean".to_owned()),
        "status was {out:?}"
    );
}

#[test]
fn terminal_diff_output_lines() {
    let mut sh = diff_workspace();
    let out = run(&mut sh, "git diff");
    let expected = [
        "diff -- src/index.txt",
        "+ Local add line",
        "- Initial overview line",
        "+ - Updated overview line",
        "- Second idea",
    ];
    for needle in expected {
        assert!(
            out.iter().any(|l| l.contains(needle)),
            "missing {needle:?} in {out:?}"
        );
    }
}

#[test]
fn cherry_pick_conflict_and_resume() {
    let (mut sh, oid) = conflict_workspace();

    let out = run(&mut sh, &format!("git cherry-pick {oid}"));
    assert!(
        out.iter()
            .any(|l| l.contains("CONFLICT (content): Merge conflict in src/utils/helpers.txt")),
        "got {out:?}"
    );
    let marked = read(&sh, "/src/utils/helpers.txt");
    assert!(marked.contains("<<<<<<<"));
    assert!(marked.contains("======="));
    assert!(marked.contains(">>>>>>>"));

    // Resolve by overwriting, stage everything, continue.
    write(&sh, "/src/utils/helpers.txt", "resolved helper\n");
    let out = run_all(
        &mut sh,
        &["git add .", "git cherry-pick --continue", "git status"],
    );
    assert!(
        out.contains(&"nothing to commit, working tree clean".to_owned()),
        "status after continue was {out:?}"
    );
    let log = run(&mut sh, "git log --oneline");
    assert!(log[0].ends_with("branch change"), "log was {log:?}");
}

#[test]
fn cherry_pick_abort_is_single_shot() {
    let (mut sh, oid) = conflict_workspace();
    run(&mut sh, &format!("git cherry-pick {oid}"));
    assert!(run(&mut sh, "git cherry-pick --abort").is_empty());
    assert_eq!(read(&sh, "/src/utils/helpers.txt"), "main helper\n");
    let out = run(&mut sh, "git cherry-pick --abort");
    assert_eq!(out, vec!["fatal: there is no operation in progress"]);
}

#[test]
fn rebase_through_the_shell() {
    let mut sh = shell();
    run(&mut sh, "git init");
    write(&sh, "/base.txt", "base\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"base\"");

    run(&mut sh, "git checkout -b feature");
    write(&sh, "/feature.txt", "feature work\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"feature commit\"");

    run(&mut sh, "git checkout main");
    write(&sh, "/main.txt", "main work\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"main commit\"");

    run(&mut sh, "git checkout feature");
    let out = run(&mut sh, "git rebase main");
    assert_eq!(
        out,
        vec!["Successfully rebased and updated refs/heads/feature."]
    );
    let log = run(&mut sh, "git log --oneline");
    let messages: Vec<&str> = log
        .iter()
        .map(|l| l.split_once(' ').map_or("", |(_, m)| m))
        .collect();
    assert_eq!(messages, vec!["feature commit", "main commit", "base"]);
    assert_eq!(read(&sh, "/feature.txt"), "feature work\n");
    assert_eq!(read(&sh, "/main.txt"), "main work\n");
}

#[test]
fn detached_head_status_line() {
    let mut sh = shell();
    run(&mut sh, "git init");
    write(&sh, "/a.txt", "1\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"one\"");
    let first = run(&mut sh, "git rev-parse HEAD")[0].clone();
    write(&sh, "/a.txt", "2\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"two\"");

    run(&mut sh, &format!("git checkout {first}"));
    let out = run(&mut sh, "git status");
    assert!(
        out[0].starts_with("HEAD detached at "),
        "status was {out:?}"
    );
    assert_eq!(read(&sh, "/a.txt"), "1\n");
}

#[test]
fn merge_fast_forward_and_log() {
    let mut sh = shell();
    run(&mut sh, "git init");
    write(&sh, "/f.txt", "1\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"one\"");
    run(&mut sh, "git checkout -b ahead");
    write(&sh, "/f.txt", "2\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"two\"");
    run(&mut sh, "git checkout main");

    let out = run(&mut sh, "git merge ahead");
    assert_eq!(out[1], "Fast-forward");
    assert_eq!(read(&sh, "/f.txt"), "2\n");
    // No merge commit: two entries only.
    assert_eq!(run(&mut sh, "git log --oneline").len(), 2);
    // Merging again reports up to date.
    assert_eq!(run(&mut sh, "git merge ahead"), vec!["Already up to date."]);
}
