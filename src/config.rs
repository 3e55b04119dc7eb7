//! Configuration types for a lake build
//!
//! The whole job is described by one YAML file: where the raw data lives,
//! where the tables go, what cluster to rent and how to watch the step.
//! Configuration is an explicit value passed into constructors; nothing in
//! the crate reads it from process-wide state.

use crate::error::{Error, Result};
use crate::types::{ActionOnFailure, CompressionCodec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete job configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeConfig {
    /// Output root for the five tables (URL or local path)
    pub bucket: String,

    /// Root of the song catalog files
    pub catalog_root: String,

    /// Glob below `catalog_root` selecting catalog files
    #[serde(default)]
    pub catalog_pattern: Option<String>,

    /// Root of the event log files
    pub log_root: String,

    /// Glob below `log_root` selecting event files
    #[serde(default)]
    pub log_pattern: Option<String>,

    /// Cluster topology and step failure policy
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Step resource profile
    #[serde(default)]
    pub step: StepConfig,

    /// Step monitoring settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Where staged artifacts go (defaults to `<bucket>/_artifacts`)
    #[serde(default)]
    pub staging_root: Option<String>,

    /// Parquet writer settings
    #[serde(default)]
    pub parquet: ParquetConfig,
}

impl LakeConfig {
    /// Resolved staging root
    pub fn staging_root(&self) -> String {
        self.staging_root
            .clone()
            .unwrap_or_else(|| format!("{}/_artifacts", self.bucket.trim_end_matches('/')))
    }
}

// ============================================================================
// Cluster Config
// ============================================================================

/// Cluster topology: one coordinator plus `node_count` workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name (also the teardown tag)
    #[serde(default = "default_cluster_name")]
    pub name: String,

    /// Provider release label
    #[serde(default = "default_release_label")]
    pub release_label: String,

    /// Number of worker nodes
    #[serde(default = "default_node_count")]
    pub node_count: u32,

    /// Instance type for coordinator and workers
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// What to do when the step fails
    #[serde(default)]
    pub action_on_failure: ActionOnFailure,

    /// Where the provider writes cluster logs
    #[serde(default)]
    pub log_uri: Option<String>,
}

fn default_cluster_name() -> String {
    "sparkify-data-lake".to_string()
}

fn default_release_label() -> String {
    "emr-5.30.0".to_string()
}

fn default_node_count() -> u32 {
    3
}

fn default_instance_type() -> String {
    "m5.xlarge".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
            release_label: default_release_label(),
            node_count: default_node_count(),
            instance_type: default_instance_type(),
            action_on_failure: ActionOnFailure::default(),
            log_uri: None,
        }
    }
}

// ============================================================================
// Step Config
// ============================================================================

/// Resource profile of the submitted step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default = "default_memory")]
    pub driver_memory: String,

    #[serde(default = "default_num_executors")]
    pub num_executors: u32,

    #[serde(default = "default_executor_cores")]
    pub executor_cores: u32,

    #[serde(default = "default_memory")]
    pub executor_memory: String,
}

fn default_memory() -> String {
    "10g".to_string()
}

fn default_num_executors() -> u32 {
    5
}

fn default_executor_cores() -> u32 {
    2
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            driver_memory: default_memory(),
            num_executors: default_num_executors(),
            executor_cores: default_executor_cores(),
            executor_memory: default_memory(),
        }
    }
}

// ============================================================================
// Monitor Config
// ============================================================================

/// How the orchestrator watches the step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up watching after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Consecutive poll errors tolerated before the step counts as failed
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    2 * 60 * 60
}

fn default_max_poll_errors() -> u32 {
    3
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            max_poll_errors: default_max_poll_errors(),
        }
    }
}

impl MonitorConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Parquet Config
// ============================================================================

/// Parquet writer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    #[serde(default)]
    pub compression: CompressionCodec,

    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    /// Dictionary-encode string columns
    #[serde(default = "default_true")]
    pub dictionary: bool,

    /// Write column statistics
    #[serde(default = "default_true")]
    pub statistics: bool,
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: CompressionCodec::default(),
            row_group_size: default_row_group_size(),
            dictionary: true,
            statistics: true,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a job configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<LakeConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load a job configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<LakeConfig> {
    let config: LakeConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate a job configuration
pub fn validate_config(config: &LakeConfig) -> Result<()> {
    for (field, value) in [
        ("bucket", &config.bucket),
        ("catalog_root", &config.catalog_root),
        ("log_root", &config.log_root),
    ] {
        if value.trim().is_empty() {
            return Err(Error::missing_field(field));
        }
    }

    if config.cluster.name.trim().is_empty() {
        return Err(Error::missing_field("cluster.name"));
    }

    if config.cluster.node_count == 0 {
        return Err(Error::invalid_value(
            "cluster.node_count",
            "at least one worker node is required",
        ));
    }

    if config.step.num_executors == 0 || config.step.executor_cores == 0 {
        return Err(Error::invalid_value(
            "step",
            "num_executors and executor_cores must be positive",
        ));
    }

    if config.monitor.poll_interval_secs == 0 {
        return Err(Error::invalid_value(
            "monitor.poll_interval_secs",
            "must be at least 1",
        ));
    }

    if config.monitor.timeout_secs < config.monitor.poll_interval_secs {
        return Err(Error::invalid_value(
            "monitor.timeout_secs",
            format!(
                "{} is shorter than the poll interval ({})",
                config.monitor.timeout_secs, config.monitor.poll_interval_secs
            ),
        ));
    }

    if config.parquet.row_group_size == 0 {
        return Err(Error::invalid_value(
            "parquet.row_group_size",
            "must be positive",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
bucket: s3://lake
catalog_root: s3://raw/song_data
log_root: s3://raw/log_data
";

    #[test]
    fn test_minimal_config_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.cluster.node_count, 3);
        assert_eq!(config.cluster.instance_type, "m5.xlarge");
        assert_eq!(
            config.cluster.action_on_failure,
            ActionOnFailure::TerminateCluster
        );
        assert_eq!(config.step, StepConfig::default());
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.staging_root(), "s3://lake/_artifacts");
        assert!(config.catalog_pattern.is_none());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
bucket: s3://lake-output/
catalog_root: s3://raw/song_data
catalog_pattern: "*/*/*/*.json"
log_root: s3://raw/log_data
log_pattern: "*.json"
cluster:
  name: nightly
  node_count: 5
  instance_type: m5.2xlarge
  action_on_failure: continue
step:
  driver_memory: 4g
  num_executors: 8
  executor_cores: 4
  executor_memory: 6g
monitor:
  poll_interval_secs: 10
  timeout_secs: 600
staging_root: s3://artifacts/songlake
parquet:
  compression: zstd
"#;
        let config = load_config_from_str(yaml).unwrap();
        assert_eq!(config.cluster.name, "nightly");
        assert_eq!(config.cluster.action_on_failure, ActionOnFailure::Continue);
        assert_eq!(config.step.num_executors, 8);
        assert_eq!(config.monitor.timeout(), Duration::from_secs(600));
        assert_eq!(config.monitor.max_poll_errors, 3);
        assert_eq!(config.staging_root(), "s3://artifacts/songlake");
        assert_eq!(config.parquet.compression, CompressionCodec::Zstd);
        assert!(config.parquet.dictionary);
        assert!(config.parquet.statistics);
        assert_eq!(config.catalog_pattern.as_deref(), Some("*/*/*/*.json"));
    }

    #[test]
    fn test_missing_root_rejected() {
        let yaml = "bucket: s3://lake\ncatalog_root: ''\nlog_root: s3://raw\n";
        let err = load_config_from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("catalog_root"));
    }

    #[test]
    fn test_zero_nodes_rejected() {
        let yaml = format!("{MINIMAL}cluster:\n  node_count: 0\n");
        let err = load_config_from_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("cluster.node_count"));
    }

    #[test]
    fn test_timeout_shorter_than_interval_rejected() {
        let yaml = format!("{MINIMAL}monitor:\n  poll_interval_secs: 60\n  timeout_secs: 5\n");
        let err = load_config_from_str(&yaml).unwrap_err();
        assert!(err.to_string().contains("monitor.timeout_secs"));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = format!("{MINIMAL}cluster:\n  action_on_failure: retry\n");
        assert!(load_config_from_str(&yaml).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lake.yaml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.bucket, "s3://lake");
    }
}
