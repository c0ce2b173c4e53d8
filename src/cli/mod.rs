// src/cli/mod.rs — CLI definition (clap derive)

pub mod edit;
pub mod inspect;
pub mod new;
pub mod progress;
pub mod run;
pub mod show;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::infra::paths;
use crate::infra::session::SessionStore;

#[derive(Parser)]
#[command(
    name = "workbench",
    about = "Iterative additive/reductive prompt refinement",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory holding session files (overrides [storage].sessions_dir)
    #[arg(long, global = true)]
    pub sessions_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new session
    New(new::NewArgs),
    /// Run the additive/reductive iterations of a session
    Run {
        handle: String,
        /// Override the session's iteration count for this run
        #[arg(short = 'n', long)]
        iterations: Option<u32>,
        /// Use the offline stub client instead of the configured provider
        #[arg(long)]
        offline: bool,
        /// Suppress progress output (only print the final draft)
        #[arg(long)]
        quiet: bool,
    },
    /// Show a session's history, or one entry of it
    Show {
        handle: String,
        /// 1-based history entry to show in full
        #[arg(short, long)]
        entry: Option<usize>,
        /// With --entry, print a diff of the entry's input and output
        #[arg(long)]
        diff: bool,
    },
    /// Replace the current draft (from a file, or stdin)
    Edit {
        handle: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Make a history entry's output the current draft again
    Restore {
        handle: String,
        /// 1-based history entry
        entry: usize,
    },
    /// Check the current draft against the session's format
    Validate { handle: String },
    /// Report template token problems and missing model configuration
    Check { handle: String },
    /// List stored sessions
    List,
}

/// Session store rooted at the CLI override, the config value, or the default.
pub fn open_store(cli_dir: Option<&str>, config: &Config) -> SessionStore {
    let root = match cli_dir {
        Some(dir) => paths::expand_home(dir),
        None => config.storage.resolve_sessions_dir(),
    };
    SessionStore::new(root)
}
