//! The terminal shell: tokenising, dispatch, and filesystem commands.
//!
//! Commands are parsed into a tagged [`ShellCommand`] sum and executed
//! by a pattern-matched executor; the git handlers live in
//! [`git`]. Context requirements (enclosing repository, current branch,
//! in-progress operation state) are expressed as typed
//! context-extending functions rather than a dynamic middleware list —
//! each handler builds exactly the context it needs.
//!
//! Failures become `fatal:` / `error:` lines in the output; the
//! dispatcher itself never fails. Commands run strictly serially: one
//! `dispatch_line` completes before the next begins.

pub mod flags;
pub mod git;

use std::sync::Arc;

use edugit_fs::{path, FileStore, FsError, NodeKind};
use tracing::info;

use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::error::{GitError, Result};
use crate::events::{EngineEvent, EventBus};
use crate::model::Oid;
use crate::repo::Repository;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The printable result of one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Lines to print, in order.
    pub lines: Vec<String>,
    /// A request to clear the screen (the `clear` command).
    pub clear_screen: bool,
}

impl CommandOutput {
    /// No output.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A single line.
    #[must_use]
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            lines: vec![text.into()],
            clear_screen: false,
        }
    }

    /// Many lines.
    #[must_use]
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            clear_screen: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed context chain (the middleware of the command table)
// ---------------------------------------------------------------------------

/// Context: an enclosing repository was found.
pub(crate) struct RepoCtx {
    pub repo: Repository,
}

/// Context: repository plus the current branch.
pub(crate) struct BranchCtx {
    pub repo: Repository,
    pub branch: Option<String>,
}

/// Context: repository, branch, and in-progress operation heads.
pub(crate) struct OpCtx {
    pub repo: Repository,
    pub branch: Option<String>,
    pub merge_head: Option<Oid>,
    pub cherry_pick_head: Option<Oid>,
    pub rebase_in_progress: bool,
}

impl RepoCtx {
    pub(crate) fn load_branch(self) -> Result<BranchCtx> {
        let branch = self.repo.current_branch()?;
        Ok(BranchCtx {
            repo: self.repo,
            branch,
        })
    }
}

impl BranchCtx {
    pub(crate) fn check_op_state(self) -> Result<OpCtx> {
        let merge_head = self.repo.read_op_oid(crate::op::MERGE_HEAD)?;
        let cherry_pick_head = self.repo.read_op_oid(crate::op::CHERRY_PICK_HEAD)?;
        let rebase_in_progress = self.repo.read_op_oid(crate::op::REBASE_HEAD)?.is_some();
        Ok(OpCtx {
            repo: self.repo,
            branch: self.branch,
            merge_head,
            cherry_pick_head,
            rebase_in_progress,
        })
    }
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

/// The interactive shell over one store.
pub struct Shell {
    store: Arc<dyn FileStore>,
    /// Current working directory (normalised absolute path).
    pub cwd: String,
    /// Host configuration (identity, default branch).
    pub config: Config,
    events: Arc<EventBus>,
    cancel: CancelFlag,
    dirty: bool,
}

impl Shell {
    /// A shell rooted at `/`.
    #[must_use]
    pub fn new(store: Arc<dyn FileStore>, config: Config) -> Self {
        Self {
            store,
            cwd: "/".to_owned(),
            config,
            events: Arc::new(EventBus::new()),
            cancel: CancelFlag::new(),
            dirty: false,
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    /// The event bus view components subscribe to.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The cancellation flag checked by long-running operations.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Mark the store mutated; the refresh token bumps after dispatch.
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Find the repository enclosing the current directory.
    pub(crate) fn require_repo(&self) -> Result<RepoCtx> {
        let repo = Repository::discover(Arc::clone(&self.store), &self.cwd)?;
        Ok(RepoCtx { repo })
    }

    /// Resolve a user path against the cwd.
    pub(crate) fn resolve(&self, user_path: &str) -> std::result::Result<String, FsError> {
        path::resolve(&self.cwd, user_path)
    }

    /// Execute one input line. Never fails; failures become output.
    pub fn dispatch_line(&mut self, line: &str) -> CommandOutput {
        let tokens = tokenize(line);
        let Some((name, args)) = tokens.split_first() else {
            return CommandOutput::empty();
        };
        info!(command = %name, "dispatch");
        self.cancel.reset();
        self.dirty = false;

        let output = match name.as_str() {
            "help" => self.cmd_help(),
            "pwd" => CommandOutput::line(self.cwd.clone()),
            "clear" => CommandOutput {
                lines: Vec::new(),
                clear_screen: true,
            },
            "ls" => self.cmd_ls(args),
            "cd" => self.cmd_cd(args),
            "cat" => self.cmd_cat(args),
            "touch" => self.cmd_touch(args),
            "mkdir" => self.cmd_mkdir(args),
            "rm" => self.cmd_rm(args),
            "rmdir" => self.cmd_rmdir(args),
            "mv" => self.cmd_mv(args),
            "git" => git::run(self, args),
            other => CommandOutput::line(format!("command not found: {other}")),
        };

        if self.dirty {
            self.events.bump_refresh();
            let branch = self
                .require_repo()
                .and_then(|ctx| ctx.repo.current_branch())
                .unwrap_or(None);
            self.events.emit(&EngineEvent::BranchName(branch));
        }
        output
    }

    // -----------------------------------------------------------------------
    // Filesystem commands
    // -----------------------------------------------------------------------

    fn cmd_help(&self) -> CommandOutput {
        CommandOutput::from_lines(vec![
            "Shell commands: help pwd clear ls cd cat touch mkdir rm rmdir mv".to_owned(),
            "Git commands:   init status add commit branch checkout switch restore".to_owned(),
            "                reset rm mv diff log merge rebase cherry-pick stash".to_owned(),
            "                remote fetch push pull clone rev-parse".to_owned(),
        ])
    }

    fn cmd_ls(&self, args: &[String]) -> CommandOutput {
        let f = flags::Flags::parse(args, &[flags::ShortSpec::flag('a', "all")]);
        let target = match f.first() {
            Some(p) => match self.resolve(p) {
                Ok(p) => p,
                Err(e) => return CommandOutput::line(format!("ls: {e}")),
            },
            None => self.cwd.clone(),
        };
        match self.store.read_dir(&target) {
            Ok(names) => {
                let mut lines = Vec::new();
                for name in names {
                    if !f.has("all") && name.starts_with('.') {
                        continue;
                    }
                    let child = path::join(&target, &name);
                    match self.store.stat(&child) {
                        Ok(Some(NodeKind::Dir)) => lines.push(format!("{name}/")),
                        _ => lines.push(name),
                    }
                }
                CommandOutput::from_lines(lines)
            }
            Err(e) => CommandOutput::line(format!("ls: {e}")),
        }
    }

    fn cmd_cd(&mut self, args: &[String]) -> CommandOutput {
        let target = match args.first() {
            Some(p) => match self.resolve(p) {
                Ok(p) => p,
                Err(e) => return CommandOutput::line(format!("cd: {e}")),
            },
            None => "/".to_owned(),
        };
        match self.store.is_dir(&target) {
            Ok(true) => {
                self.cwd = target;
                CommandOutput::empty()
            }
            Ok(false) => CommandOutput::line(format!("cd: not a directory: {target}")),
            Err(e) => CommandOutput::line(format!("cd: {e}")),
        }
    }

    fn cmd_cat(&self, args: &[String]) -> CommandOutput {
        let Some(file) = args.first() else {
            return CommandOutput::line("cat: missing file operand");
        };
        let target = match self.resolve(file) {
            Ok(p) => p,
            Err(e) => return CommandOutput::line(format!("cat: {e}")),
        };
        match self.store.read_file(&target) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                CommandOutput::from_lines(text.lines().map(str::to_owned).collect())
            }
            Err(e) => CommandOutput::line(format!("cat: {e}")),
        }
    }

    fn cmd_touch(&mut self, args: &[String]) -> CommandOutput {
        let Some(file) = args.first() else {
            return CommandOutput::line("touch: missing file operand");
        };
        let target = match self.resolve(file) {
            Ok(p) => p,
            Err(e) => return CommandOutput::line(format!("touch: {e}")),
        };
        match self.store.stat(&target) {
            Ok(Some(_)) => CommandOutput::empty(),
            Ok(None) => match self.store.write_file_all(&target, b"") {
                Ok(()) => {
                    self.mark_dirty();
                    CommandOutput::empty()
                }
                Err(e) => CommandOutput::line(format!("touch: {e}")),
            },
            Err(e) => CommandOutput::line(format!("touch: {e}")),
        }
    }

    fn cmd_mkdir(&mut self, args: &[String]) -> CommandOutput {
        let Some(dir) = args.first() else {
            return CommandOutput::line("mkdir: missing operand");
        };
        let target = match self.resolve(dir) {
            Ok(p) => p,
            Err(e) => return CommandOutput::line(format!("mkdir: {e}")),
        };
        match self.store.mkdir_all(&target) {
            Ok(()) => {
                self.mark_dirty();
                CommandOutput::empty()
            }
            Err(e) => CommandOutput::line(format!("mkdir: {e}")),
        }
    }

    fn cmd_rm(&mut self, args: &[String]) -> CommandOutput {
        let f = flags::Flags::parse(args, &[flags::ShortSpec::flag('r', "recursive")]);
        let Some(target) = f.first() else {
            return CommandOutput::line("rm: missing operand");
        };
        let target = match self.resolve(target) {
            Ok(p) => p,
            Err(e) => return CommandOutput::line(format!("rm: {e}")),
        };
        let result = match self.store.stat(&target) {
            Ok(Some(NodeKind::Dir)) if !f.has("recursive") => {
                return CommandOutput::line(format!("rm: cannot remove '{target}': Is a directory"));
            }
            Ok(Some(NodeKind::Dir)) => self.store.remove_all(&target),
            Ok(Some(NodeKind::File)) => self.store.unlink(&target),
            Ok(None) => Err(FsError::not_found(&target)),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.mark_dirty();
                CommandOutput::empty()
            }
            Err(e) => CommandOutput::line(format!("rm: {e}")),
        }
    }

    fn cmd_rmdir(&mut self, args: &[String]) -> CommandOutput {
        let Some(dir) = args.first() else {
            return CommandOutput::line("rmdir: missing operand");
        };
        let target = match self.resolve(dir) {
            Ok(p) => p,
            Err(e) => return CommandOutput::line(format!("rmdir: {e}")),
        };
        match self.store.rmdir(&target) {
            Ok(()) => {
                self.mark_dirty();
                CommandOutput::empty()
            }
            Err(e) => CommandOutput::line(format!("rmdir: {e}")),
        }
    }

    fn cmd_mv(&mut self, args: &[String]) -> CommandOutput {
        let (Some(from), Some(to)) = (args.first(), args.get(1)) else {
            return CommandOutput::line("mv: missing file operand");
        };
        let (from, to) = match (self.resolve(from), self.resolve(to)) {
            (Ok(f), Ok(t)) => (f, t),
            (Err(e), _) | (_, Err(e)) => return CommandOutput::line(format!("mv: {e}")),
        };
        // Moving onto an existing directory drops the source inside it.
        let to = match self.store.stat(&to) {
            Ok(Some(NodeKind::Dir)) => path::join(&to, path::file_name(&from)),
            _ => to,
        };
        match self.store.rename(&from, &to) {
            Ok(()) => {
                self.mark_dirty();
                CommandOutput::empty()
            }
            Err(e) => CommandOutput::line(format!("mv: {e}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokeniser
// ---------------------------------------------------------------------------

/// Split a raw line into tokens, honouring single and double quotes.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            },
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Render a [`GitError`] as terminal output lines.
pub(crate) fn error_output(err: &GitError) -> CommandOutput {
    match err {
        GitError::DirtyWorkingTree { files } => {
            let mut lines = vec![
                "error: your local changes to the following files would be overwritten:".to_owned(),
            ];
            lines.extend(files.iter().map(|f| format!("\t{f}")));
            lines.push("Please commit your changes or stash them first.".to_owned());
            CommandOutput::from_lines(lines)
        }
        GitError::UnresolvedConflicts { files } => {
            let mut lines =
                vec!["error: committing is not possible because you have unmerged files."
                    .to_owned()];
            lines.extend(files.iter().map(|f| format!("\t{f}")));
            CommandOutput::from_lines(lines)
        }
        other => CommandOutput::line(format!("fatal: {other}")),
    }
}
