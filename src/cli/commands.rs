//! CLI commands and argument parsing

use crate::types::Table;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Songlake star-schema builder CLI
#[derive(Parser, Debug)]
#[command(name = "songlake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (YAML)
    #[arg(short, long, global = true, default_value = "lake.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision a cluster, run the transformation step on it and tear it down
    Run {
        /// Seconds between step status polls (overrides the config)
        #[arg(long)]
        poll_interval_secs: Option<u64>,

        /// Give up on the step after this many seconds (overrides the config)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Run the transformation step in this process, without a cluster
    Transform {
        /// Run id used in data file names (defaults to a timestamp)
        #[arg(long)]
        run_id: Option<String>,

        /// Number of rejected records to include in the report
        #[arg(long, default_value = "20")]
        rejection_samples: usize,
    },

    /// Show the cluster request and step command without running anything
    Plan,

    /// Validate the job configuration
    Validate,

    /// Summarize the committed tables under the output root
    Summary {
        /// Only this table
        #[arg(long)]
        table: Option<Table>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
