//! Neutron CLI - launch emulated games with cloud save sync
//!
//! Every play session pulls the newest server save first, then pushes the
//! save and reports playtime once the emulator exits.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::emulator::run_emulator;
use crate::commands::launch::run_launch;
use crate::commands::library::run_library;
use crate::commands::sync::run_sync;
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
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("neutron=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let mut context = CliContext::open(cli.data_dir.as_deref())?;
    match cli.command {
        Commands::Launch {
            game,
            platform,
            json,
        } => run_launch(game, platform, json, &context).await,
        Commands::Library { command } => run_library(command, &context),
        Commands::Emulator { command } => run_emulator(command, &context),
        Commands::Sync { command } => run_sync(command, &context).await,
        Commands::Config { command } => run_config(command, &mut context),
        Commands::Auth { command } => run_auth(command, &context),
        Commands::Completions { .. } => Ok(()),
    }
}
