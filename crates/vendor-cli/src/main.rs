//! Vendorfiles CLI
//!
//! The command-line interface for vendoring files from GitHub repositories.

mod cli;
mod commands;
mod context;
mod error;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use vendor_core::SourceProvider;
use vendor_github::GitHubClient;

use cli::{Cli, Commands};
use commands::InstallArgs;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} Vendorfiles CLI", "vendor".green().bold());
        println!();
        println!("Run {} for available commands.", "vendor --help".cyan());
        return Ok(());
    };

    let start = context::start_dir(cli.folder.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_command(&start, command))
}

/// `--verbose` wins over `RUST_LOG`; the default only shows warnings.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("Verbose mode enabled");
}

/// GitHub client for the commands that reach the network.
fn github() -> Result<Arc<dyn SourceProvider>> {
    Ok(Arc::new(GitHubClient::from_env()?))
}

async fn execute_command(start: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Sync { force } => commands::run_sync(start, github()?, force).await,
        Commands::Update { names, json } => {
            commands::run_update(start, github()?, &names, json).await
        }
        Commands::Outdated => commands::run_outdated(start, github()?).await,
        Commands::Install {
            source,
            version,
            name,
            files,
        } => {
            let args = InstallArgs {
                source,
                version,
                name,
                files,
            };
            commands::run_install(start, github()?, args).await
        }
        Commands::Uninstall { names } => commands::run_uninstall(start, &names),
    }
}
