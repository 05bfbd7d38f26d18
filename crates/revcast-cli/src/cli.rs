//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Revcast - weekly MRR forecasting from deal-level pipeline data
#[derive(Parser)]
#[command(name = "revcast")]
#[command(about = "Weekly MRR forecast: levers, trend, and SCQA report", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Warehouse database path
    #[arg(long, default_value = "revcast.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the warehouse schema
    Init,

    /// Import deal or next-best-action rows from CSV
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the file as a next-best-action list instead of deals
        #[arg(long)]
        actions: bool,
    },

    /// Run the full weekly pipeline and print the report
    Run {
        /// Random seed for the importance model (required for
        /// reproducibility unless supplied via --config)
        #[arg(long)]
        seed: Option<u64>,

        /// TOML config file (must contain random_seed)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Quick trend-based forecast without the importance model
    Forecast {
        /// Number of weeks to forecast
        #[arg(short, long, default_value_t = 4)]
        weeks: usize,

        /// Trailing weeks averaged for the trend
        #[arg(long, default_value_t = 4)]
        window: usize,
    },

    /// Print the persisted outputs of the most recent run
    Report,

    /// Start the MCP server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind
        #[arg(short, long, default_value_t = 3100)]
        port: u16,

        /// Random seed for pipeline runs triggered through the server
        #[arg(long)]
        seed: Option<u64>,

        /// TOML config file (must contain random_seed)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
