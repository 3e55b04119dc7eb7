// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Songlake
//!
//! Builds a star-schema data lake from a song catalog and a listening event
//! log, as a batch step run on an ephemeral cluster.
//!
//! ## Features
//!
//! - **Validated Extraction**: Line-delimited JSON read from S3, R2, GCS, Azure or local disk
//! - **Star Schema**: songs, artists, users and time dimensions plus a songplays fact table
//! - **Partitioned Parquet**: Hive-style layout, each partition replaced atomically per run
//! - **Cluster Lifecycle**: provision, stage, submit, monitor and always tear down
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use songlake::{load_config, Pipeline, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("lake.yaml")?;
//!
//!     // Run the transformation step in-process
//!     let report = Pipeline::from_config(&config)?.run().await?;
//!     println!("{} partitions written", report.partitions_written());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ClusterOrchestrator                         │
//! │  provision → stage → submit → monitor → terminate               │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │ step
//! ┌──────────────┬───────────────┴───────────────┬──────────────────┐
//! │   Extract    │         Transform             │   Output         │
//! ├──────────────┼───────────────────────────────┼──────────────────┤
//! │ Glob select  │ Dimensions (first/latest wins)│ Hive partitions  │
//! │ Schema check │ Facts (title/artist/duration) │ Parquet          │
//! │ Rejections   │ Dense songplay ids            │ Manifests        │
//! └──────────────┴───────────────────────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Job configuration
pub mod config;

/// Raw record schemas and validation
pub mod schema;

/// Object storage roots
pub mod store;

/// Record extraction from line-delimited JSON files
pub mod extract;

/// Star schema derivation
pub mod transform;

/// Partition keys and Hive-style paths
pub mod partition;

/// Arrow/Parquet output
pub mod output;

/// The transformation step
pub mod pipeline;

/// Cluster lifecycle orchestration
pub mod cluster;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use cluster::{ClusterOrchestrator, ClusterProvider, ClusterState, LocalProvider, RunReport};
pub use config::{load_config, load_config_from_str, LakeConfig};
pub use pipeline::{Pipeline, PipelineReport};
pub use store::LakeStore;
pub use transform::{build_star_schema, StarSchema};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
