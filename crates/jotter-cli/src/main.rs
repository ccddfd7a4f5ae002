//! Jotter CLI - keep one memo in sync with a private GitHub gist
//!
//! Every memo command reconciles with the gist first, edits the local copy,
//! then pushes.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{resolve_db_path, GlobalOptions};
use crate::commands::completions::run_completions;
use crate::commands::compose::run_compose;
use crate::commands::config::run_config;
use crate::commands::limit::run_limit;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::wipe::run_wipe;
use crate::commands::write::{run_append, run_write};
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

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jotter_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Commands that never touch the memo database.
    let command = match command {
        Commands::Completions { shell, output } => {
            return run_completions(shell, output.as_deref());
        }
        Commands::Config { command } => return run_config(command, cli.profile.as_deref()),
        other => other,
    };

    let options = GlobalOptions {
        db_path: resolve_db_path(cli.db_path)?,
        profile: cli.profile,
        offline: cli.offline,
    };

    match command {
        Commands::Show { json } => run_show(json, &options).await,
        Commands::Write { text } => run_write(&text, &options).await,
        Commands::Append { text } => run_append(&text, &options).await,
        Commands::Limit { limit_type, value } => {
            run_limit(limit_type.into(), value, &options).await
        }
        Commands::Status { json } => run_status(json, &options).await,
        Commands::Sync { pull } => run_sync(pull, &options).await,
        Commands::Compose => run_compose(&options).await,
        Commands::Wipe { yes } => run_wipe(yes, &options).await,
        Commands::Auth { command } => run_auth(command, &options).await,
        Commands::Completions { .. } | Commands::Config { .. } => Ok(()),
    }
}
