//! CineStream CLI - Command-line interface
//!
//! Runs searches and stream resolution against the configured sites.

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use cinestream_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::Parser;

#[derive(Parser)]
#[command(name = "cinestream")]
#[command(about = "Search movie and series sites and resolve playable streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the per-run trace log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    /// JSON file with site descriptors replacing the built-in sites
    #[arg(long, global = true)]
    sites: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .context("failed to initialise logging")?;

    let options = commands::GlobalOptions {
        sites: cli.sites,
        json: cli.json,
    };
    commands::handle_command(cli.command, &options).await
}
