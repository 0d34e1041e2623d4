use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use edugit_fs::MemStore;
use tracing_subscriber::EnvFilter;

use edugit::config::Config;
use edugit::shell::Shell;
use edugit::snapshot::{Snapshot, Workspace};

/// Interactive git learning environment over a virtual filesystem.
///
/// Starts an empty in-memory workspace and a shell that understands
/// both filesystem commands (ls, cd, cat, ...) and git commands. Use
/// --import to restore a previously exported workspace snapshot.
#[derive(Parser)]
#[command(name = "edugit")]
#[command(version, about)]
struct Cli {
    /// Import a workspace snapshot (JSON) before starting.
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Export the workspace to this file on exit.
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Host configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        None => Ok(Config::default()),
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading config {}", p.display()))?;
            Config::from_toml(&text).with_context(|| format!("parsing config {}", p.display()))
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let mem = Arc::new(MemStore::new());
    let workspace = Workspace::new(Arc::clone(&mem));

    if let Some(path) = &cli.import {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot: Snapshot =
            serde_json::from_str(&text).with_context(|| "parsing snapshot")?;
        workspace
            .import(&snapshot)
            .with_context(|| "importing snapshot")?;
        println!("Imported workspace snapshot from {}", path.display());
    }

    let mut shell = Shell::new(workspace.store(), config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} $ ", shell.cwd);
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim_end();
        if line == "exit" || line == "quit" {
            break;
        }
        let output = shell.dispatch_line(line);
        if output.clear_screen {
            print!("\x1b[2J\x1b[H");
            stdout.flush()?;
        }
        for out_line in output.lines {
            println!("{out_line}");
        }
    }

    if let Some(path) = &cli.export {
        let snapshot = workspace
            .export(edugit::snapshot::UiState::default(), now_secs())
            .with_context(|| "exporting workspace")?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        println!("Exported workspace snapshot to {}", path.display());
    }

    Ok(())
}
