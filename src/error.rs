//! Error types for songlake
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Bad input records are not errors: extraction reports them as
//! [`Rejection`](crate::extract::Rejection)s and keeps going. Errors here are
//! the conditions that end a run (or a step of it).

use thiserror::Error;

/// The main error type for songlake
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Storage error at '{path}': {message}")]
    Storage { path: String, message: String },

    #[error("Invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    // ============================================================================
    // Arrow/Parquet Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("Failed to write partition '{partition}' of table '{table}': {message}")]
    PartitionWrite {
        table: String,
        partition: String,
        message: String,
    },

    // ============================================================================
    // Orchestration Errors
    // ============================================================================
    #[error("Cluster provisioning failed: {message}")]
    Provisioning { message: String },

    #[error("Artifact staging failed: {message}")]
    Staging { message: String },

    #[error("Step submission failed: {message}")]
    Submission { message: String },

    #[error("Step '{step_id}' failed: {message}")]
    StepFailed { step_id: String, message: String },

    #[error("Step '{step_id}' did not finish within {timeout_secs}s")]
    StepTimedOut { step_id: String, timeout_secs: u64 },

    #[error("Cluster job cancelled")]
    Cancelled,

    #[error("Cluster teardown failed for '{cluster}': {message}")]
    Teardown { cluster: String, message: String },

    #[error("Cluster provider error: {message}")]
    Provider { message: String },

    #[error("Invalid cluster state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a pattern error
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create a partition write error
    pub fn partition_write(
        table: impl Into<String>,
        partition: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PartitionWrite {
            table: table.into(),
            partition: partition.into(),
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Storage hiccups and provider errors are worth another attempt; bad
    /// configuration and step failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ObjectStore(e) => !matches!(
                e,
                object_store::Error::NotFound { .. }
                    | object_store::Error::InvalidPath { .. }
                    | object_store::Error::NotSupported { .. }
            ),
            Error::Storage { .. }
            | Error::PartitionWrite { .. }
            | Error::Provider { .. }
            | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Check if this error means the cluster job did not complete successfully
    pub fn is_job_failure(&self) -> bool {
        matches!(
            self,
            Error::Provisioning { .. }
                | Error::Staging { .. }
                | Error::Submission { .. }
                | Error::StepFailed { .. }
                | Error::StepTimedOut { .. }
                | Error::Cancelled
        )
    }
}

/// Result type alias for songlake
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }
}
