//! `onomast` -- enrich lists of given names through an LLM provider.
//!
//! Provides the following subcommands:
//!
//! - `onomast enrich` -- Classify, describe and rate the pronunciation of
//!   the names in a CSV file, under a requests-per-minute budget.
//! - `onomast tiers` -- Show the built-in provider rate presets.

use clap::Parser;

mod commands;
mod csv_io;

/// Name enrichment CLI.
#[derive(Parser)]
#[command(name = "onomast", about = "Enrich CSV name lists with origin, description and pronunciation", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Enrich the names of a CSV file.
    Enrich(commands::enrich::EnrichArgs),

    /// Show provider tier presets.
    Tiers(commands::tiers::TiersArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Enrich(args) => commands::enrich::run(args).await?,
        Commands::Tiers(args) => commands::tiers::run(args)?,
    }

    Ok(())
}
