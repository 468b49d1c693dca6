//! tasksync CLI - edit Linear tasks from the terminal
//!
//! Edits go through a local draft first, so nothing typed is lost when the
//! network or the API misbehaves.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::config::run_config;
use crate::commands::draft::run_draft;
use crate::commands::task::run_task;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy()
                .add_directive(
                    "tasksync=info"
                        .parse()
                        .map_err(|error| CliError::Config(format!("invalid log filter: {error}")))?,
                ),
        )
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Task { command } => run_task(command, profile, cli.store_path).await?,
        Commands::Draft { command } => run_draft(command, profile, cli.store_path)?,
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile)?,
    }

    Ok(())
}
