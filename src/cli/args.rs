//! Command-line argument definitions for the ingestion CLI
//!
//! Defines the CLI interface using the clap derive API. Global flags layer
//! over the configuration file and environment; subcommands map onto the
//! orchestrator's public operations.

use crate::error::{IngestError, Result};
use crate::models::DatasetKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the dashboard ingestion pipeline
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dashboard-ingest",
    version,
    about = "Download, parse and cache the dashboard's large CSV exports",
    long_about = "Keeps a persistent local cache of the bar transactions and ticket sales \
                  exports. Each load checks the cache against the server's metadata probe \
                  and a maximum age, and only downloads and re-parses the export when the \
                  cache is missing, expired or out of date."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the dashboard API
    #[arg(
        long = "api-url",
        value_name = "URL",
        global = true,
        help = "Base URL of the dashboard API (overrides config and DASHBOARD_API_URL)"
    )]
    pub api_url: Option<String>,

    /// Directory holding the persistent cache
    #[arg(
        long = "cache-dir",
        value_name = "PATH",
        global = true,
        help = "Cache directory (overrides config and DASHBOARD_CACHE_DIR)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (JSON format)"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Load datasets, serving the cache when it is still fresh
    Load(LoadArgs),
    /// Download and re-parse datasets regardless of cache freshness
    Refetch(DatasetArgs),
    /// Empty the persistent cache
    Clear(DatasetArgs),
    /// Show what the cache holds
    Status(StatusArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct LoadArgs {
    #[arg(
        short = 'd',
        long = "dataset",
        value_name = "NAME",
        default_value = "all",
        help = "Dataset to load: bar, ticket-sales or all"
    )]
    pub dataset: DatasetSelection,

    /// Maximum cache age in minutes before a refetch is forced
    #[arg(
        long = "max-age",
        value_name = "MINUTES",
        help = "Maximum cache age in minutes (defaults to the configured value)"
    )]
    pub max_age: Option<u64>,

    /// Print the first N records of each dataset as JSON lines
    #[arg(long = "sample", value_name = "N", default_value_t = 0)]
    pub sample: usize,
}

#[derive(Debug, Clone, Parser)]
pub struct DatasetArgs {
    #[arg(
        short = 'd',
        long = "dataset",
        value_name = "NAME",
        default_value = "all",
        help = "Dataset: bar, ticket-sales or all"
    )]
    pub dataset: DatasetSelection,
}

#[derive(Debug, Clone, Parser)]
pub struct StatusArgs {
    #[arg(
        long = "format",
        value_enum,
        default_value = "human",
        help = "Output format for the status report"
    )]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// One dataset kind, or every kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSelection {
    One(DatasetKind),
    All,
}

impl DatasetSelection {
    pub fn kinds(&self) -> Vec<DatasetKind> {
        match self {
            DatasetSelection::One(kind) => vec![*kind],
            DatasetSelection::All => DatasetKind::ALL.to_vec(),
        }
    }
}

impl FromStr for DatasetSelection {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(DatasetSelection::All);
        }
        s.parse().map(DatasetSelection::One)
    }
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
