// src/cli/new.rs — `workbench new`: create a session

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::core::formats::OutputFormat;
use crate::core::types::{ModelTier, Session};
use crate::infra::session::{handle_from_title, SessionStore};

#[derive(Args, Debug, Clone, Default)]
pub struct NewArgs {
    /// Session handle (derived from the title or outcome when omitted)
    pub handle: Option<String>,
    /// Display title
    #[arg(long)]
    pub title: Option<String>,
    /// What the artifact should be (prompted for on a terminal when omitted)
    #[arg(long)]
    pub outcome: Option<String>,
    /// Requirements and constraints
    #[arg(long)]
    pub requirements: Option<String>,
    /// Special resources available to the artifact
    #[arg(long)]
    pub resources: Option<String>,
    /// Output format: json, markdown, code or text
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
    /// Iterations per run (each is one additive + one reductive phase)
    #[arg(short = 'n', long, default_value_t = 1)]
    pub iterations: u32,
    /// What the additive phase may change
    #[arg(long)]
    pub additive_rules: Option<String>,
    /// What the reductive phase may change
    #[arg(long)]
    pub reductive_rules: Option<String>,
    /// Additive prompt template file
    #[arg(long)]
    pub additive_template: Option<PathBuf>,
    /// Reductive prompt template file
    #[arg(long)]
    pub reductive_template: Option<PathBuf>,
    /// Run additive phases on the premium model
    #[arg(long)]
    pub premium_additive: bool,
    /// Run reductive phases on the premium model
    #[arg(long)]
    pub premium_reductive: bool,
    /// Overwrite an existing session with the same handle
    #[arg(long)]
    pub force: bool,
}

pub fn run_new(store: &SessionStore, args: NewArgs) -> anyhow::Result<()> {
    let outcome = match args.outcome.clone() {
        Some(o) if !o.trim().is_empty() => o,
        _ => prompt_outcome()?,
    };
    let session = build_session(outcome, &args)?;

    let handle = match args.handle {
        Some(ref h) => h.clone(),
        None => handle_from_title(session.display_title()),
    };
    if store.exists(&handle) && !args.force {
        anyhow::bail!("Session '{handle}' already exists (use --force to overwrite)");
    }

    store.save(&handle, &session)?;
    println!("Created session '{handle}'");
    println!("  {}", store.path_for(&handle)?.display());
    Ok(())
}

fn prompt_outcome() -> anyhow::Result<String> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!("--outcome is required when stdin is not a terminal");
    }
    match inquire::Text::new("Outcome:")
        .with_help_message("Describe the artifact to iterate on")
        .prompt_skippable()?
    {
        Some(o) if !o.trim().is_empty() => Ok(o),
        _ => anyhow::bail!("An outcome is required"),
    }
}

/// Assemble a session from CLI arguments, keeping defaults for anything unset.
pub fn build_session(outcome: String, args: &NewArgs) -> anyhow::Result<Session> {
    let mut session = Session::new(outcome, args.format);
    if args.iterations < 1 {
        anyhow::bail!("--iterations must be at least 1");
    }
    session.iterations_requested = args.iterations;
    if let Some(ref t) = args.title {
        session.title = t.trim().to_string();
    }
    if let Some(ref r) = args.requirements {
        session.requirements = r.clone();
    }
    if let Some(ref r) = args.resources {
        session.special_resources = r.clone();
    }
    if let Some(ref r) = args.additive_rules {
        session.additive_policy = r.clone();
    }
    if let Some(ref r) = args.reductive_rules {
        session.reductive_policy = r.clone();
    }
    if let Some(ref p) = args.additive_template {
        session.additive_template = read_template(p)?;
    }
    if let Some(ref p) = args.reductive_template {
        session.reductive_template = read_template(p)?;
    }
    if args.premium_additive {
        session.additive_tier = ModelTier::Premium;
    }
    if args.premium_reductive {
        session.reductive_tier = ModelTier::Premium;
    }
    Ok(session)
}

fn read_template(path: &Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read template {}: {e}", path.display()))?;
    if text.trim().is_empty() {
        anyhow::bail!("Template {} is empty", path.display());
    }
    Ok(text)
}
