//! Mirrorlake CLI - Command-line interface for the Mirrorlake cache
//!
//! Provides commands for:
//! - Managing connection profiles
//! - Inspecting cached buckets and objects offline
//! - Searching the cache
//! - Viewing per-scope sync status and cache statistics

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    buckets::BucketsCommand, objects::ObjectsCommand, profile::ProfileCommand,
    search::SearchCommand, stats::StatsCommand, status::StatusCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "mirrorlake", version, about = "Offline cache for S3-compatible object storage")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use an alternate cache database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage connection profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// List cached buckets of a profile
    Buckets(BucketsCommand),
    /// List cached objects of one listing scope
    Objects(ObjectsCommand),
    /// Search cached object keys or bucket names
    Search(SearchCommand),
    /// Show per-scope sync status
    Status(StatusCommand),
    /// Show cache row counts
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Profile(cmd) => cmd.execute(format, cli.db).await,
        Commands::Buckets(cmd) => cmd.execute(format, cli.db).await,
        Commands::Objects(cmd) => cmd.execute(format, cli.db).await,
        Commands::Search(cmd) => cmd.execute(format, cli.db).await,
        Commands::Status(cmd) => cmd.execute(format, cli.db).await,
        Commands::Stats(cmd) => cmd.execute(format, cli.db).await,
    }
}
