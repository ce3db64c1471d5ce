use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use unscramble::analysis::TreeKind;
use unscramble::cli::commands::{self, Workspace};
use unscramble::cli::{Cli, Commands};
use unscramble::config::load_project_config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let project_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_project_config(&project_path, cli.config.as_deref())?;

    let workspace = Workspace {
        snapshot: cli.snapshot.clone(),
        mappings: cli.mappings.clone(),
        config,
        format: cli.format.clone(),
    };

    let output = match &cli.command {
        Commands::Classes => commands::run_classes(&workspace)?,
        Commands::Info { entry } => commands::run_info(&workspace, entry)?,
        Commands::At { source, position } => commands::run_at(&workspace, source, *position)?,
        Commands::Inheritance { entry } => {
            commands::run_tree(&workspace, TreeKind::Inheritance, entry)?
        }
        Commands::Implementations { entry } => {
            commands::run_tree(&workspace, TreeKind::Implementations, entry)?
        }
        Commands::Calls { entry } => commands::run_tree(&workspace, TreeKind::Calls, entry)?,
        Commands::Tokens { source, entry } => commands::run_tokens(&workspace, source, entry)?,
        Commands::Highlights { source } => commands::run_highlights(&workspace, source)?,
        Commands::Rename { entry, new_name } => {
            commands::run_rename(&workspace, entry, new_name)?
        }
    };
    print!("{}", output);

    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
