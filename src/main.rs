// src/main.rs — workbench entry point

use clap::Parser;

use workbench::cli::run::RunOptions;
use workbench::cli::{self, Cli, Commands};
use workbench::infra::config::Config;
use workbench::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        let mut config = Config::load_from(std::path::Path::new(path))?;
        config.apply_env_with(|name| std::env::var(name).ok())?;
        config
    } else {
        Config::load()?
    };

    // Initialize logging (RUST_LOG overrides [logging].level)
    logger::init_logging(&config.logging.level);

    let store = cli::open_store(cli.sessions_dir.as_deref(), &config);
    tracing::debug!("session store at {}", store.root().display());

    match cli.command {
        Commands::New(args) => cli::new::run_new(&store, args),
        Commands::Run {
            handle,
            iterations,
            offline,
            quiet,
        } => {
            let opts = RunOptions {
                iterations,
                offline,
                quiet,
            };
            cli::run::run_session(&config, &store, &handle, opts).await
        }
        Commands::Show {
            handle,
            entry,
            diff,
        } => cli::show::run_show(&store, &handle, entry, diff),
        Commands::Edit { handle, file } => cli::edit::run_edit(&store, &handle, file.as_deref()),
        Commands::Restore { handle, entry } => cli::edit::run_restore(&store, &handle, entry),
        Commands::Validate { handle } => cli::inspect::run_validate(&store, &handle),
        Commands::Check { handle } => cli::inspect::run_check(&config, &store, &handle),
        Commands::List => cli::show::run_list(&store),
    }
}
