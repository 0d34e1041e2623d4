//! Shared fixtures for the integration scenarios.
//!
//! Each test builds an isolated in-memory workspace and drives it
//! through the shell, the way the terminal and the workspace UI do.

#![allow(dead_code)]

use std::sync::Arc;

use edugit::config::Config;
use edugit::shell::Shell;
use edugit_fs::{FileStore, MemStore};

/// A fresh shell over an empty in-memory store.
pub fn shell() -> Shell {
    let store: Arc<dyn FileStore> = Arc::new(MemStore::new());
    Shell::new(store, Config::default())
}

/// Run one command line, returning its output lines.
pub fn run(shell: &mut Shell, line: &str) -> Vec<String> {
    shell.dispatch_line(line).lines
}

/// Run several command lines, returning the last command's output.
pub fn run_all(shell: &mut Shell, lines: &[&str]) -> Vec<String> {
    let mut last = Vec::new();
    for line in lines {
        last = run(shell, line);
    }
    last
}

/// Write a file through the store (the editor's write path).
pub fn write(shell: &Shell, path: &str, content: &str) {
    shell
        .store()
        .write_file_all(path, content.as_bytes())
        .expect("write fixture file");
}

/// Read a file back as text.
pub fn read(shell: &Shell, path: &str) -> String {
    String::from_utf8_lossy(&shell.store().read_file(path).expect("read fixture file"))
        .into_owned()
}

/// The diff-demo workspace: one commit, then local edits that produce
/// one added line, one modified line, and one removed line.
///
/// | path               | committed                      | working tree              |
/// |--------------------|--------------------------------|---------------------------|
/// | src/index.txt      | `Start line`                   | + `Local add line`        |
/// | docs/overview.txt  | `Initial overview line`        | `- Updated overview line` |
/// | notes/ideas.txt    | `First idea`, `Second idea`    | second line removed       |
pub fn diff_workspace() -> Shell {
    let mut sh = shell();
    run(&mut sh, "git init");
    write(&sh, "/src/index.txt", "Start line\n");
    write(&sh, "/docs/overview.txt", "Initial overview line\n");
    write(&sh, "/notes/ideas.txt", "First idea\nSecond idea\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"seed workspace\"");

    write(&sh, "/src/index.txt", "Start line\nLocal add line\n");
    write(&sh, "/docs/overview.txt", "- Updated overview line\n");
    write(&sh, "/notes/ideas.txt", "First idea\n");
    sh
}

/// The conflict fixture: `main` and `conflict_branch` both edit
/// `src/utils/helpers.txt` from a shared base commit. Returns the
/// shell (on `main`) and the oid of the conflicting branch commit.
pub fn conflict_workspace() -> (Shell, String) {
    let mut sh = shell();
    run(&mut sh, "git init");
    write(&sh, "/src/utils/helpers.txt", "shared helper\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"add helpers\"");

    run(&mut sh, "git checkout -b conflict_branch");
    write(&sh, "/src/utils/helpers.txt", "branch helper\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"branch change\"");
    let oid = run(&mut sh, "git rev-parse HEAD")[0].clone();

    run(&mut sh, "git checkout main");
    write(&sh, "/src/utils/helpers.txt", "main helper\n");
    run(&mut sh, "git add .");
    run(&mut sh, "git commit -m \"main change\"");
    (sh, oid)
}
