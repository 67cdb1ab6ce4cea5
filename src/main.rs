mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
mod workflow;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::notes::{self, NotesCommand};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::infra::anthropic::AnthropicClient;
use crate::infra::git::GitCli;

#[derive(Parser)]
#[command(
    name = "shipnote",
    author,
    version,
    about = "Turn git commit history into categorized release notes"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Notes(NotesCommand),
    /// Manage stored configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> AppResult<bool> {
    match command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(true)
        }
        Commands::Notes(command) => run_notes(command).await,
    }
}

async fn run_notes(command: NotesCommand) -> AppResult<bool> {
    let cwd = std::env::current_dir()?;
    let config = AppConfig::load(&cwd)?;

    if config.api_key.is_none() && !matches!(command, NotesCommand::Fetch(_)) {
        warn!("Anthropic API key not configured; set ANTHROPIC_API_KEY or run `shipnote config init`.");
    }

    let language_model = Arc::new(AnthropicClient::new(&config)?);
    let version_control = Arc::new(GitCli::new());
    let context = AppContext::new(config, version_control, language_model);

    let response = notes::run(&context, command).await;
    let rendered = serde_json::to_string_pretty(&response).map_err(AppError::Render)?;
    println!("{rendered}");

    Ok(response.success)
}
