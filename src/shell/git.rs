//! The `git` subcommand executor.
//!
//! One pattern-matched dispatcher over the full command surface. Every
//! handler returns `Result<CommandOutput>`; errors are rendered as
//! `fatal:` / `error:` lines by the caller, so a failed command still
//! returns normally to the terminal loop. User-visible strings follow
//! classic git phrasing.

use edugit_fs::FsErrorKind;

use crate::error::{GitError, Result};
use crate::model::Oid;
use crate::op::{CherryPickOutcome, MergeOutcome, RebaseOutcome};
use crate::remote::protocol::{clone_repo, PushOutcome};
use crate::repo::Repository;
use crate::shell::flags::{Flags, ShortSpec};
use crate::shell::{error_output, CommandOutput, Shell};
use crate::status::StatusReport;
use crate::worktree::CheckoutOpts;

/// Execute `git <args>`.
pub(crate) fn run(shell: &mut Shell, args: &[String]) -> CommandOutput {
    let Some((sub, rest)) = args.split_first() else {
        return CommandOutput::line("usage: git <command> [<args>]");
    };
    let result = match sub.as_str() {
        "init" => cmd_init(shell),
        "status" => cmd_status(shell),
        "add" => cmd_add(shell, rest),
        "commit" => cmd_commit(shell, rest),
        "branch" => cmd_branch(shell, rest),
        "checkout" => cmd_checkout(shell, rest, 'b'),
        "switch" => cmd_checkout(shell, rest, 'c'),
        "restore" => cmd_restore(shell, rest),
        "reset" => cmd_reset(shell, rest),
        "rm" => cmd_rm(shell, rest),
        "mv" => cmd_mv(shell, rest),
        "diff" => cmd_diff(shell, rest),
        "log" => cmd_log(shell, rest),
        "merge" => cmd_merge(shell, rest),
        "rebase" => cmd_rebase(shell, rest),
        "cherry-pick" => cmd_cherry_pick(shell, rest),
        "stash" => cmd_stash(shell, rest),
        "remote" => cmd_remote(shell, rest),
        "fetch" => cmd_fetch(shell, rest),
        "push" => cmd_push(shell, rest),
        "pull" => cmd_pull(shell, rest),
        "clone" => cmd_clone(shell, rest),
        "rev-parse" => cmd_rev_parse(shell, rest),
        other => Ok(CommandOutput::line(format!(
            "git: '{other}' is not a git command. See 'git help'."
        ))),
    };
    result.unwrap_or_else(|e| error_output(&e))
}

/// A user path argument, as a repo-relative path.
fn rel_path(shell: &Shell, repo: &Repository, user_path: &str) -> Result<String> {
    let abs = shell.resolve(user_path)?;
    let rel = repo.rel(&abs).ok_or_else(|| GitError::InvalidRef {
        name: user_path.to_owned(),
    })?;
    Ok(if rel.is_empty() { ".".to_owned() } else { rel })
}

fn push_text_block(lines: &mut Vec<String>, text: &str) {
    lines.extend(
        text.trim_end_matches('\n')
            .split('\n')
            .map(str::to_owned),
    );
}

// ---------------------------------------------------------------------------
// Repository setup & status
// ---------------------------------------------------------------------------

fn cmd_init(shell: &mut Shell) -> Result<CommandOutput> {
    let cwd = shell.cwd.clone();
    let default_branch = shell.config.repo.default_branch.clone();
    let (repo, created) = Repository::init(
        std::sync::Arc::clone(shell.store()),
        &cwd,
        &default_branch,
    )?;
    shell.mark_dirty();
    let gitdir = repo.git_dir();
    Ok(CommandOutput::line(if created {
        format!("Initialized empty Git repository in {gitdir}/")
    } else {
        format!("Reinitialized existing Git repository in {gitdir}/")
    }))
}

fn render_status(report: &StatusReport, head_line: String, merging: bool) -> Vec<String> {
    let mut lines = vec![head_line];
    if merging {
        if report.conflicted.is_empty() {
            lines.push("All conflicts fixed but you are still merging.".to_owned());
            lines.push("  (use \"git commit\" to conclude merge)".to_owned());
        } else {
            lines.push("You have unmerged paths.".to_owned());
            lines.push("  (fix conflicts and run \"git commit\")".to_owned());
        }
    }
    let staged = !report.staged_new.is_empty()
        || !report.staged_modified.is_empty()
        || !report.staged_deleted.is_empty();
    if staged {
        lines.push("Changes to be committed:".to_owned());
        for p in &report.staged_new {
            lines.push(format!("\tnew file:   {p}"));
        }
        for p in &report.staged_modified {
            lines.push(format!("\tmodified:   {p}"));
        }
        for p in &report.staged_deleted {
            lines.push(format!("\tdeleted:    {p}"));
        }
    }
    if !report.conflicted.is_empty() {
        lines.push("Unmerged paths:".to_owned());
        for p in &report.conflicted {
            lines.push(format!("\tboth modified:   {p}"));
        }
    }
    if !report.unstaged_modified.is_empty() || !report.unstaged_deleted.is_empty() {
        lines.push("Changes not staged for commit:".to_owned());
        for p in &report.unstaged_modified {
            lines.push(format!("\tmodified:   {p}"));
        }
        for p in &report.unstaged_deleted {
            lines.push(format!("\tdeleted:    {p}"));
        }
    }
    if !report.untracked.is_empty() {
        lines.push("Untracked files:".to_owned());
        for p in &report.untracked {
            lines.push(format!("\t{p}"));
        }
    }
    if report.is_clean() {
        lines.push("nothing to commit, working tree clean".to_owned());
    }
    lines
}

fn cmd_status(shell: &Shell) -> Result<CommandOutput> {
    let ctx = shell.require_repo()?.load_branch()?.check_op_state()?;
    let report = ctx.repo.status_report()?;
    let head_line = match &ctx.branch {
        Some(branch) => format!("On branch {branch}"),
        None => {
            let short = ctx
                .repo
                .head_oid()?
                .map_or_else(|| "?".to_owned(), |o| o.short());
            format!("HEAD detached at {short}")
        }
    };
    Ok(CommandOutput::from_lines(render_status(
        &report,
        head_line,
        ctx.merge_head.is_some(),
    )))
}

// ---------------------------------------------------------------------------
// Staging & committing
// ---------------------------------------------------------------------------

fn cmd_add(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let Some(spec) = f.first() else {
        return Ok(CommandOutput::line(
            "Nothing specified, nothing added.".to_owned(),
        ));
    };
    let ctx = shell.require_repo()?;
    let rel = rel_path(shell, &ctx.repo, spec)?;
    match ctx.repo.add(&rel) {
        Ok(_) => {
            shell.mark_dirty();
            Ok(CommandOutput::empty())
        }
        Err(GitError::Fs(e)) if e.kind == FsErrorKind::NotFound => Ok(CommandOutput::line(
            format!("fatal: pathspec '{spec}' did not match any files"),
        )),
        Err(e) => Err(e),
    }
}

fn cmd_commit(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[ShortSpec::value('m', "message")]);
    let ctx = shell.require_repo()?.load_branch()?.check_op_state()?;
    let message = f.value("message");
    if message.is_none() && ctx.merge_head.is_none() && ctx.cherry_pick_head.is_none() {
        return Ok(CommandOutput::line(
            "fatal: no commit message given (use -m)".to_owned(),
        ));
    }
    let identity = shell.config.identity.clone();
    let result = ctx.repo.commit(message, &identity)?;
    match result {
        crate::commit::CommitResult::NothingToCommit => {
            let branch_line = ctx
                .branch
                .map_or_else(|| "HEAD detached".to_owned(), |b| format!("On branch {b}"));
            Ok(CommandOutput::from_lines(vec![
                branch_line,
                "nothing to commit, working tree clean".to_owned(),
            ]))
        }
        crate::commit::CommitResult::Created { oid, branch, .. } => {
            shell.mark_dirty();
            let name = branch.unwrap_or_else(|| "detached HEAD".to_owned());
            let summary = ctx.repo.read_commit(oid)?.summary().to_owned();
            Ok(CommandOutput::line(format!(
                "[{name} {}] {summary}",
                oid.short()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Branching & switching
// ---------------------------------------------------------------------------

fn cmd_branch(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(
        args,
        &[
            ShortSpec::value('d', "delete"),
            ShortSpec::value('D', "force-delete"),
            ShortSpec::flag('r', "remotes"),
            ShortSpec::flag('a', "all"),
        ],
    );
    let ctx = shell.require_repo()?.load_branch()?;

    if let Some(name) = f.value("delete").or_else(|| f.value("force-delete")) {
        let forced = f.has("force-delete");
        if ctx.branch.as_deref() == Some(name) {
            return Ok(CommandOutput::line(format!(
                "error: Cannot delete branch '{name}' checked out at '{}'",
                ctx.repo.root()
            )));
        }
        let ref_name = format!("refs/heads/{name}");
        let Some(tip) = ctx.repo.read_ref(&ref_name)? else {
            return Ok(CommandOutput::line(format!(
                "error: branch '{name}' not found."
            )));
        };
        if !forced {
            let head = ctx.repo.head_oid()?;
            let merged = match head {
                Some(h) => ctx.repo.is_descendent(h, tip)?,
                None => false,
            };
            if !merged {
                return Ok(CommandOutput::line(format!(
                    "error: The branch '{name}' is not fully merged."
                )));
            }
        }
        ctx.repo.delete_ref(&ref_name)?;
        shell.mark_dirty();
        return Ok(CommandOutput::line(format!(
            "Deleted branch {name} (was {}).",
            tip.short()
        )));
    }

    if let Some(name) = f.first() {
        let head = ctx.repo.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        match ctx.repo.write_ref(&format!("refs/heads/{name}"), head, false) {
            Ok(()) => {
                shell.mark_dirty();
                return Ok(CommandOutput::empty());
            }
            Err(GitError::NameExists { .. }) => {
                return Ok(CommandOutput::line(format!(
                    "fatal: A branch named '{name}' already exists."
                )));
            }
            Err(e) => return Err(e),
        }
    }

    // Listing.
    let mut lines = Vec::new();
    if !f.has("remotes") {
        for b in ctx.repo.list_branches()? {
            if ctx.branch.as_deref() == Some(b.as_str()) {
                lines.push(format!("* {b}"));
            } else {
                lines.push(format!("  {b}"));
            }
        }
    }
    if f.has("remotes") || f.has("all") {
        for remote in ctx.repo.list_tracking_remotes()? {
            for b in ctx.repo.list_remote_branches(&remote)? {
                lines.push(format!("  remotes/{remote}/{b}"));
            }
        }
    }
    Ok(CommandOutput::from_lines(lines))
}

fn cmd_checkout(shell: &mut Shell, args: &[String], create_letter: char) -> Result<CommandOutput> {
    let f = Flags::parse(
        args,
        &[
            ShortSpec::value(create_letter, "new-branch"),
            ShortSpec::flag('f', "force"),
        ],
    );
    let ctx = shell.require_repo()?;

    // `checkout [ref] -- <paths>` restores files without moving HEAD.
    if f.saw_double_dash {
        let pre_count = f.positionals.len() - f.after_double_dash.len();
        let source = f.positionals[..pre_count].first().cloned();
        let mut filepaths = Vec::new();
        for p in &f.after_double_dash {
            filepaths.push(rel_path(shell, &ctx.repo, p)?);
        }
        ctx.repo.checkout(&CheckoutOpts {
            target: source,
            filepaths: Some(filepaths),
            ..CheckoutOpts::default()
        })?;
        shell.mark_dirty();
        return Ok(CommandOutput::empty());
    }

    if let Some(name) = f.value("new-branch") {
        let head = ctx.repo.head_oid()?.ok_or_else(|| GitError::InvalidRef {
            name: "HEAD".to_owned(),
        })?;
        ctx.repo
            .write_ref(&format!("refs/heads/{name}"), head, false)
            .map_err(|e| match e {
                GitError::NameExists { .. } => GitError::NameExists {
                    name: name.to_owned(),
                },
                other => other,
            })?;
        ctx.repo.checkout(&CheckoutOpts::branch(name))?;
        shell.mark_dirty();
        return Ok(CommandOutput::line(format!(
            "Switched to a new branch '{name}'"
        )));
    }

    let Some(target) = f.first() else {
        return Ok(CommandOutput::line("fatal: missing branch or commit".to_owned()));
    };
    let opts = CheckoutOpts {
        target: Some(target.to_owned()),
        force: f.has("force"),
        ..CheckoutOpts::default()
    };
    let is_branch = ctx
        .repo
        .read_ref(&format!("refs/heads/{target}"))?
        .is_some();
    ctx.repo.checkout(&opts)?;
    shell.mark_dirty();
    if is_branch {
        Ok(CommandOutput::line(format!("Switched to branch '{target}'")))
    } else {
        let oid = ctx.repo.head_oid()?.unwrap_or(Oid::from_bytes([0; 20]));
        let summary = ctx.repo.read_commit(oid)?.summary().to_owned();
        Ok(CommandOutput::from_lines(vec![
            format!("Note: switching to '{target}'."),
            format!("HEAD is now at {} {summary}", oid.short()),
        ]))
    }
}

fn cmd_restore(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    if f.positionals.is_empty() {
        return Ok(CommandOutput::line(
            "fatal: you must specify path(s) to restore".to_owned(),
        ));
    }
    let ctx = shell.require_repo()?;
    for p in f.positionals.clone() {
        let rel = rel_path(shell, &ctx.repo, &p)?;
        if f.has("staged") {
            ctx.repo.reset_index(&rel)?;
        } else {
            let index = ctx.repo.load_index()?;
            let Some(oid) = index.staged_oid(&rel) else {
                return Ok(CommandOutput::line(format!(
                    "error: pathspec '{p}' did not match any file(s) known to git"
                )));
            };
            let data = ctx.repo.read_blob(oid)?;
            ctx.repo
                .store()
                .write_file_all(&ctx.repo.work_path(&rel), &data)?;
        }
    }
    shell.mark_dirty();
    Ok(CommandOutput::empty())
}

fn cmd_reset(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?.load_branch()?;

    if f.has("hard") {
        let target = f.first().unwrap_or("HEAD");
        let oid = ctx.repo.resolve_commitish(target)?;
        match &ctx.branch {
            Some(branch) => ctx
                .repo
                .write_ref(&format!("refs/heads/{branch}"), oid, true)?,
            None => ctx.repo.set_head_detached(oid)?,
        }
        ctx.repo
            .reset_worktree_and_index(&ctx.repo.flatten_commit(Some(oid))?)?;
        shell.mark_dirty();
        let summary = ctx.repo.read_commit(oid)?.summary().to_owned();
        return Ok(CommandOutput::line(format!(
            "HEAD is now at {} {summary}",
            oid.short()
        )));
    }

    // `reset [HEAD] <paths>` unstages.
    let paths: Vec<&String> = f
        .positionals
        .iter()
        .filter(|p| p.as_str() != "HEAD")
        .collect();
    for p in paths {
        let rel = rel_path(shell, &ctx.repo, p)?;
        ctx.repo.reset_index(&rel)?;
    }
    shell.mark_dirty();
    Ok(CommandOutput::empty())
}

fn cmd_rm(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let Some(p) = f.first() else {
        return Ok(CommandOutput::line("fatal: No pathspec was given.".to_owned()));
    };
    let ctx = shell.require_repo()?;
    let rel = rel_path(shell, &ctx.repo, p)?;
    match ctx.repo.remove_path(&rel) {
        Ok(()) => {
            shell.mark_dirty();
            Ok(CommandOutput::line(format!("rm '{rel}'")))
        }
        Err(GitError::Fs(e)) if e.kind == FsErrorKind::NotFound => Ok(CommandOutput::line(
            format!("fatal: pathspec '{p}' did not match any files"),
        )),
        Err(e) => Err(e),
    }
}

fn cmd_mv(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let (Some(from), Some(to)) = (f.positionals.first(), f.positionals.get(1)) else {
        return Ok(CommandOutput::line("usage: git mv <source> <destination>".to_owned()));
    };
    let ctx = shell.require_repo()?;
    let rel_from = rel_path(shell, &ctx.repo, from)?;
    let rel_to = rel_path(shell, &ctx.repo, to)?;

    let mut index = ctx.repo.load_index()?;
    let Some(oid) = index.staged_oid(&rel_from) else {
        return Ok(CommandOutput::line(format!(
            "fatal: not under version control, source={rel_from}"
        )));
    };
    ctx.repo
        .store()
        .rename(&ctx.repo.work_path(&rel_from), &ctx.repo.work_path(&rel_to))?;
    index.remove(&rel_from);
    index.set(&rel_to, oid);
    ctx.repo.save_index(&index)?;
    shell.mark_dirty();
    Ok(CommandOutput::empty())
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

fn cmd_diff(shell: &Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let staged = f.has("staged") || f.has("cached");
    let ctx = shell.require_repo()?;
    let repo = &ctx.repo;

    let head = repo.flatten_commit(repo.head_oid()?)?;
    let index = repo.load_index()?;

    let mut filter = Vec::new();
    for p in &f.positionals {
        filter.push(rel_path(shell, repo, p)?);
    }

    let mut paths: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    paths.extend(head.keys().cloned());
    paths.extend(index.paths());
    if !staged {
        paths.extend(repo.worktree_files()?);
    }

    let mut lines = Vec::new();
    for path in paths {
        if !filter.is_empty()
            && !filter
                .iter()
                .any(|x| x == &path || path.starts_with(&format!("{x}/")))
        {
            continue;
        }
        let head_oid = head.get(&path).copied();
        let (old, new) = if staged {
            let staged_oid = index.staged_oid(&path);
            if staged_oid.is_none() && head_oid.is_none() {
                continue;
            }
            (repo.blob_text(head_oid)?, repo.blob_text(staged_oid)?)
        } else {
            let base_oid = index.staged_oid(&path).or(head_oid);
            if base_oid.is_none() {
                continue; // untracked
            }
            let abs = repo.work_path(&path);
            let new = if repo.store().exists(&abs)? {
                String::from_utf8_lossy(&repo.store().read_file(&abs)?).into_owned()
            } else {
                String::new()
            };
            (repo.blob_text(base_oid)?, new)
        };
        if let Some(text) = crate::diff::unified_diff(&path, &old, &new) {
            push_text_block(&mut lines, &text);
        }
    }
    Ok(CommandOutput::from_lines(lines))
}

fn cmd_log(shell: &Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[ShortSpec::value('n', "max-count")]);
    let ctx = shell.require_repo()?.load_branch()?;
    let Some(head) = ctx.repo.head_oid()? else {
        let branch = ctx.branch.as_deref().unwrap_or("HEAD");
        return Ok(CommandOutput::line(format!(
            "fatal: your current branch '{branch}' does not have any commits yet"
        )));
    };
    let start = match f.first() {
        Some(rf) => ctx.repo.resolve_commitish(rf)?,
        None => head,
    };
    let mut entries = ctx.repo.log(start)?;
    if let Some(n) = f.value("max-count").and_then(|v| v.parse::<usize>().ok()) {
        entries.truncate(n);
    }

    let mut lines = Vec::new();
    if f.has("oneline") {
        for e in entries {
            lines.push(format!("{} {}", e.oid.short(), e.commit.summary()));
        }
    } else {
        for e in entries {
            lines.push(format!("commit {}", e.oid));
            lines.push(format!(
                "Author: {} <{}>",
                e.commit.author.name, e.commit.author.email
            ));
            lines.push(format!("Date:   {} +0000", e.commit.author.timestamp));
            lines.push(String::new());
            for msg_line in e.commit.message.lines() {
                lines.push(format!("    {msg_line}"));
            }
            lines.push(String::new());
        }
        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
    }
    Ok(CommandOutput::from_lines(lines))
}

fn cmd_rev_parse(shell: &Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let Some(rf) = f.first() else {
        return Ok(CommandOutput::line("fatal: missing revision".to_owned()));
    };
    let ctx = shell.require_repo()?;
    let oid = ctx.repo.resolve_commitish(rf)?;
    Ok(CommandOutput::line(if f.has("short") {
        oid.short()
    } else {
        oid.to_hex()
    }))
}

// ---------------------------------------------------------------------------
// Merge / rebase / cherry-pick
// ---------------------------------------------------------------------------

fn cmd_merge(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?;
    if f.has("abort") {
        ctx.repo.merge_abort()?;
        shell.mark_dirty();
        return Ok(CommandOutput::empty());
    }
    let Some(theirs) = f.first() else {
        return Ok(CommandOutput::line("fatal: no branch specified".to_owned()));
    };
    let before = ctx.repo.head_oid()?;
    let identity = shell.config.identity.clone();
    let outcome = ctx.repo.merge(theirs, &identity)?;
    Ok(match outcome {
        MergeOutcome::AlreadyUpToDate => CommandOutput::line("Already up to date."),
        MergeOutcome::FastForward { to } => {
            shell.mark_dirty();
            let from = before.map_or_else(|| "0000000".to_owned(), |o| o.short());
            CommandOutput::from_lines(vec![
                format!("Updating {from}..{}", to.short()),
                "Fast-forward".to_owned(),
            ])
        }
        MergeOutcome::Merged { .. } => {
            shell.mark_dirty();
            CommandOutput::line("Merge made by the 'recursive' strategy.")
        }
        MergeOutcome::Conflict { files } => {
            shell.mark_dirty();
            let mut lines = Vec::new();
            for file in &files {
                lines.push(format!("Auto-merging {file}"));
                lines.push(format!("CONFLICT (content): Merge conflict in {file}"));
            }
            lines.push("Automatic merge failed; fix conflicts and commit the result.".to_owned());
            CommandOutput::from_lines(lines)
        }
    })
}

fn cmd_rebase(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?.load_branch()?;
    let identity = shell.config.identity.clone();
    let cancel = shell.cancel_flag();

    let outcome = if f.has("abort") {
        ctx.repo.rebase_abort()?;
        shell.mark_dirty();
        return Ok(CommandOutput::empty());
    } else if f.has("continue") {
        ctx.repo.rebase_continue(&identity, &cancel)?
    } else {
        let Some(upstream) = f.first() else {
            return Ok(CommandOutput::line(
                "fatal: invalid upstream; usage: git rebase <upstream>".to_owned(),
            ));
        };
        ctx.repo.rebase(upstream, &identity, &cancel)?
    };

    let branch = ctx.branch.unwrap_or_else(|| "HEAD".to_owned());
    Ok(match outcome {
        RebaseOutcome::UpToDate => {
            CommandOutput::line(format!("Current branch {branch} is up to date."))
        }
        RebaseOutcome::Complete { .. } => {
            shell.mark_dirty();
            CommandOutput::line(format!(
                "Successfully rebased and updated refs/heads/{branch}."
            ))
        }
        RebaseOutcome::Stopped { oid, files } => {
            shell.mark_dirty();
            let mut lines = Vec::new();
            for file in &files {
                lines.push(format!("CONFLICT (content): Merge conflict in {file}"));
            }
            let summary = ctx.repo.read_commit(oid)?.summary().to_owned();
            lines.push(format!("error: could not apply {}... {summary}", oid.short()));
            lines.push(
                "hint: Resolve all conflicts manually, mark them with \"git add\", then run \
                 \"git rebase --continue\"."
                    .to_owned(),
            );
            CommandOutput::from_lines(lines)
        }
        RebaseOutcome::Cancelled => {
            shell.mark_dirty();
            CommandOutput::line("rebase paused; run 'git rebase --continue' to resume")
        }
    })
}

fn cmd_cherry_pick(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?.load_branch()?;
    let identity = shell.config.identity.clone();

    let outcome = if f.has("abort") {
        ctx.repo.cherry_pick_abort()?;
        shell.mark_dirty();
        return Ok(CommandOutput::empty());
    } else if f.has("continue") {
        ctx.repo.cherry_pick_continue(&identity)?
    } else {
        let Some(rf) = f.first() else {
            return Ok(CommandOutput::line("usage: git cherry-pick <commit>".to_owned()));
        };
        ctx.repo.cherry_pick(rf, &identity)?
    };

    Ok(match outcome {
        CherryPickOutcome::Applied { oid } => {
            shell.mark_dirty();
            let name = ctx.branch.unwrap_or_else(|| "detached HEAD".to_owned());
            let summary = ctx.repo.read_commit(oid)?.summary().to_owned();
            CommandOutput::line(format!("[{name} {}] {summary}", oid.short()))
        }
        CherryPickOutcome::Conflict { files } => {
            shell.mark_dirty();
            let mut lines = Vec::new();
            for file in &files {
                lines.push(format!("Auto-merging {file}"));
                lines.push(format!("CONFLICT (content): Merge conflict in {file}"));
            }
            lines.push(
                "hint: After resolving the conflicts, mark them with \"git add\", then run \
                 \"git cherry-pick --continue\"."
                    .to_owned(),
            );
            CommandOutput::from_lines(lines)
        }
    })
}

fn cmd_stash(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let ctx = shell.require_repo()?;
    match args.first().map(String::as_str) {
        None | Some("push") => {
            let f = Flags::parse(args, &[ShortSpec::value('m', "message")]);
            match ctx.repo.stash_push(f.value("message"))? {
                None => Ok(CommandOutput::line("No local changes to save")),
                Some(entry) => {
                    shell.mark_dirty();
                    Ok(CommandOutput::line(format!(
                        "Saved working directory and index state {}",
                        entry.message
                    )))
                }
            }
        }
        Some("pop") => {
            ctx.repo.stash_pop()?;
            shell.mark_dirty();
            Ok(CommandOutput::line("Dropped stash@{0}"))
        }
        Some("list") => {
            let lines = ctx
                .repo
                .stash_list()?
                .iter()
                .enumerate()
                .map(|(i, e)| format!("stash@{{{i}}}: {}", e.message))
                .collect();
            Ok(CommandOutput::from_lines(lines))
        }
        Some(other) => Ok(CommandOutput::line(format!(
            "git stash: unknown subcommand '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Remotes
// ---------------------------------------------------------------------------

fn cmd_remote(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[ShortSpec::flag('v', "verbose")]);
    let ctx = shell.require_repo()?;
    if f.first() == Some("add") {
        let (Some(name), Some(url)) = (f.positionals.get(1), f.positionals.get(2)) else {
            return Ok(CommandOutput::line("usage: git remote add <name> <url>".to_owned()));
        };
        ctx.repo.remote_add(name, url)?;
        shell.mark_dirty();
        return Ok(CommandOutput::empty());
    }
    let mut lines = Vec::new();
    for (name, url) in ctx.repo.remote_list()? {
        if f.has("verbose") {
            lines.push(format!("{name}\t{url} (fetch)"));
            lines.push(format!("{name}\t{url} (push)"));
        } else {
            lines.push(name);
        }
    }
    Ok(CommandOutput::from_lines(lines))
}

fn cmd_fetch(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?;
    let remote = f.first().unwrap_or("origin");
    let branch = f.positionals.get(1).map(String::as_str);
    let cancel = shell.cancel_flag();
    let updated = ctx.repo.fetch(remote, branch, &cancel)?;
    shell.mark_dirty();
    let url = ctx
        .repo
        .remote_url(remote)?
        .unwrap_or_else(|| crate::remote::remote_path(remote));
    let mut lines = vec![format!("From {url}")];
    for (b, _tip) in updated {
        lines.push(format!(" * branch            {b}          -> {remote}/{b}"));
    }
    Ok(CommandOutput::from_lines(lines))
}

fn cmd_push(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[ShortSpec::flag('u', "set-upstream")]);
    let ctx = shell.require_repo()?.load_branch()?;
    let branch = match f.positionals.get(1).cloned().or(ctx.branch.clone()) {
        Some(b) => b,
        None => {
            return Ok(CommandOutput::line(
                "fatal: You are not currently on a branch.".to_owned(),
            ))
        }
    };
    let remote = f.first().map_or_else(
        || {
            ctx.repo
                .upstream_of(&branch)
                .ok()
                .flatten()
                .map_or_else(|| "origin".to_owned(), |(r, _)| r)
        },
        str::to_owned,
    );
    let cancel = shell.cancel_flag();
    let outcome = ctx
        .repo
        .push(&remote, &branch, f.has("set-upstream"), &cancel)?;
    let url = ctx
        .repo
        .remote_url(&remote)?
        .unwrap_or_else(|| crate::remote::remote_path(&remote));
    Ok(match outcome {
        PushOutcome::UpToDate => CommandOutput::line("Everything up-to-date"),
        PushOutcome::Updated { branch, .. } => {
            shell.mark_dirty();
            CommandOutput::from_lines(vec![
                format!("To {url}"),
                format!("   {branch} -> {branch}"),
            ])
        }
        PushOutcome::RejectedNonFastForward => CommandOutput::from_lines(vec![
            format!("! [rejected]        {branch} -> {branch} (non-fast-forward)"),
            format!("error: failed to push some refs to '{url}'"),
        ]),
    })
}

fn cmd_pull(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let ctx = shell.require_repo()?;
    let remote = f.first().unwrap_or("origin");
    let branch = f.positionals.get(1).map(String::as_str);
    let identity = shell.config.identity.clone();
    let cancel = shell.cancel_flag();
    let outcome = ctx.repo.pull(remote, branch, &identity, &cancel)?;
    shell.mark_dirty();
    Ok(match outcome {
        MergeOutcome::AlreadyUpToDate => CommandOutput::line("Already up to date."),
        MergeOutcome::FastForward { to } => CommandOutput::from_lines(vec![
            format!("Updating ..{}", to.short()),
            "Fast-forward".to_owned(),
        ]),
        MergeOutcome::Merged { .. } => {
            CommandOutput::line("Merge made by the 'recursive' strategy.")
        }
        MergeOutcome::Conflict { files } => {
            let mut lines = Vec::new();
            for file in &files {
                lines.push(format!("CONFLICT (content): Merge conflict in {file}"));
            }
            lines.push("Automatic merge failed; fix conflicts and commit the result.".to_owned());
            CommandOutput::from_lines(lines)
        }
    })
}

fn cmd_clone(shell: &mut Shell, args: &[String]) -> Result<CommandOutput> {
    let f = Flags::parse(args, &[]);
    let Some(url) = f.first() else {
        return Ok(CommandOutput::line(
            "fatal: You must specify a repository to clone.".to_owned(),
        ));
    };
    let dir = f
        .positionals
        .get(1)
        .cloned()
        .unwrap_or_else(|| edugit_fs::path::file_name(url).to_owned());
    let target = shell.resolve(&dir)?;
    let cancel = shell.cancel_flag();
    clone_repo(shell.store(), url, &target, &cancel)?;
    shell.mark_dirty();
    Ok(CommandOutput::line(format!("Cloning into '{dir}'...")))
}
