//! CLI module
//!
//! Command-line interface for building the lake.
//!
//! # Commands
//!
//! - `run` - Provision a cluster, run the step, tear the cluster down
//! - `transform` - Run the step in this process
//! - `plan` - Show the cluster request and step command
//! - `validate` - Validate the job configuration
//! - `summary` - Summarize committed tables

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
