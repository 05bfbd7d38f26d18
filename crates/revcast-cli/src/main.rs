//! Revcast CLI - weekly MRR forecasting
//!
//! Usage:
//!   revcast init                         Initialize the warehouse
//!   revcast import --file deals.csv      Import deal rows
//!   revcast run --seed 42                Run the pipeline, print the report
//!   revcast forecast --weeks 4           Quick trend forecast
//!   revcast serve --port 3100            Start the MCP server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import { file, actions } => commands::cmd_import(&cli.db, &file, actions),
        Commands::Run { seed, config } => commands::cmd_run(&cli.db, seed, config.as_deref()),
        Commands::Forecast { weeks, window } => commands::cmd_forecast(&cli.db, weeks, window),
        Commands::Report => commands::cmd_report(&cli.db),
        Commands::Serve {
            host,
            port,
            seed,
            config,
        } => commands::cmd_serve(&cli.db, &host, port, seed, config.as_deref()).await,
    }
}
