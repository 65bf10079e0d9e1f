//! NTPSync CLI - Set the system clock from an NTP server
//!
//! Provides commands for:
//! - Synchronizing the clock once (`sync`)
//! - An interactive menu around a long-lived controller (`shell`)
//! - Help, about and donation pages
//! - Inspecting the configuration
//! - Generating shell completions

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ntpsync_core::config::Config;
use ntpsync_core::ports::Destination;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;
mod preferences;
mod terminal;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, shell::ShellCommand,
    sync::SyncCommand, CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "ntpsync",
    version,
    about = "Set the system clock from an NTP time server",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize the system clock once
    Sync(SyncCommand),
    /// Interactive menu
    Shell(ShellCommand),
    /// Show usage help
    Help,
    /// Show version and license
    About,
    /// Support the project
    Donate,
    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log filter for the given verbosity when `RUST_LOG` is not set
fn default_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    match (verbose, quiet) {
        (0, true) => "error".to_string(),
        (0, false) => configured.to_string(),
        (1, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, configured_level: &str) {
    let filter = default_filter(cli.verbose, cli.quiet, configured_level);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = CliContext {
        format: OutputFormat::from_json_flag(cli.json),
        quiet: cli.quiet,
        config_path: cli.config.clone().unwrap_or_else(Config::default_path),
    };
    init_tracing(&cli, &ctx.config().logging.level);

    match cli.command {
        Commands::Sync(cmd) => {
            if !cmd.execute(&ctx).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Shell(cmd) => cmd.execute(&ctx).await,
        Commands::Help => commands::nav::execute(Destination::Help, &ctx),
        Commands::About => commands::nav::execute(Destination::About, &ctx),
        Commands::Donate => commands::nav::execute(Destination::Donations, &ctx),
        Commands::Config(cmd) => cmd.execute(&ctx),
        Commands::Completions(cmd) => cmd.execute(&ctx),
    }
}
