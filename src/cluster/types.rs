//! Cluster lifecycle types
//!
//! This module provides:
//! - `ClusterState`: the lifecycle state machine
//! - `StepStatus`: what a provider reports for a submitted step
//! - Handles passed between the orchestrator and a provider
//! - `JobOutcome` and `RunReport`: how a run ended

use crate::config::{ClusterConfig, StepConfig};
use crate::error::{Error, Result};
use crate::types::ActionOnFailure;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Artifact name of the staged job configuration
pub const CONFIG_ARTIFACT: &str = "lake.yaml";

/// Artifact name of the staged step description
pub const STEP_ARTIFACT: &str = "step.json";

/// Default name of the transformation step
pub const DEFAULT_STEP_NAME: &str = "spark-transform-step";

// ============================================================================
// State Machine
// ============================================================================

/// Lifecycle state of one cluster run
///
/// ```text
/// Idle -> Provisioning -> Staging -> Submitting -> Running -> Monitoring
///      -> {Succeeded | Failed | TimedOut} -> Terminating -> Terminated
/// ```
///
/// Any state before an outcome may also move straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    #[default]
    Idle,
    Provisioning,
    Staging,
    Submitting,
    Running,
    Monitoring,
    Succeeded,
    Failed,
    TimedOut,
    Terminating,
    Terminated,
}

impl ClusterState {
    /// Returns true once nothing further can happen.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Returns true for the three step outcomes.
    #[must_use]
    pub const fn is_outcome(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }

    /// Returns true if the transition from self to target is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Idle => matches!(target, Self::Provisioning),
            Self::Provisioning => matches!(target, Self::Staging | Self::Failed),
            Self::Staging => matches!(target, Self::Submitting | Self::Failed),
            Self::Submitting => matches!(target, Self::Running | Self::Failed),
            Self::Running => matches!(target, Self::Monitoring | Self::Failed),
            Self::Monitoring => {
                matches!(target, Self::Succeeded | Self::Failed | Self::TimedOut)
            }
            Self::Succeeded | Self::Failed | Self::TimedOut => matches!(target, Self::Terminating),
            Self::Terminating => matches!(target, Self::Terminated),
            Self::Terminated => false,
        }
    }

    /// Returns all valid target states from the current state.
    #[must_use]
    pub fn valid_transitions(&self) -> Vec<Self> {
        match self {
            Self::Idle => vec![Self::Provisioning],
            Self::Provisioning => vec![Self::Staging, Self::Failed],
            Self::Staging => vec![Self::Submitting, Self::Failed],
            Self::Submitting => vec![Self::Running, Self::Failed],
            Self::Running => vec![Self::Monitoring, Self::Failed],
            Self::Monitoring => vec![Self::Succeeded, Self::Failed, Self::TimedOut],
            Self::Succeeded | Self::Failed | Self::TimedOut => vec![Self::Terminating],
            Self::Terminating => vec![Self::Terminated],
            Self::Terminated => vec![],
        }
    }

    /// Returns a lowercase label suitable for logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Provisioning => "provisioning",
            Self::Staging => "staging",
            Self::Submitting => "submitting",
            Self::Running => "running",
            Self::Monitoring => "monitoring",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Provisioning => write!(f, "PROVISIONING"),
            Self::Staging => write!(f, "STAGING"),
            Self::Submitting => write!(f, "SUBMITTING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Monitoring => write!(f, "MONITORING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
            Self::Terminating => write!(f, "TERMINATING"),
            Self::Terminated => write!(f, "TERMINATED"),
        }
    }
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub from: ClusterState,
    pub to: ClusterState,
    pub at: DateTime<Utc>,
}

// ============================================================================
// Provider Handles
// ============================================================================

/// Status of a submitted step as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed { reason: String },
}

/// What to provision: one coordinator plus `node_count` workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRequest {
    pub name: String,
    pub release_label: String,
    pub instance_type: String,
    pub node_count: u32,
    pub log_uri: Option<String>,
}

impl From<&ClusterConfig> for ClusterRequest {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            name: config.name.clone(),
            release_label: config.release_label.clone(),
            instance_type: config.instance_type.clone(),
            node_count: config.node_count,
            log_uri: config.log_uri.clone(),
        }
    }
}

/// A cluster known to a provider
///
/// `id` is `None` when provisioning never returned one; the provider then
/// reclaims resources by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterHandle {
    pub name: String,
    pub id: Option<String>,
}

impl ClusterHandle {
    /// Handle for a provisioned cluster
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }

    /// Handle carrying only the requested name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }
}

impl std::fmt::Display for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} ({id})", self.name),
            None => write!(f, "{} (no id)", self.name),
        }
    }
}

/// One file to stage for the step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub data: Bytes,
}

impl Artifact {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Where staged artifacts ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedRef {
    /// Location of the staging directory
    pub location: String,
    /// Staged artifact names
    pub artifacts: Vec<String>,
}

impl StagedRef {
    /// Location of one staged artifact
    pub fn artifact(&self, name: &str) -> Option<String> {
        self.artifacts
            .iter()
            .any(|a| a == name)
            .then(|| format!("{}/{name}", self.location.trim_end_matches('/')))
    }
}

/// A submitted step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepHandle {
    pub cluster: ClusterHandle,
    pub step_id: String,
}

/// Resource profile and failure policy of the step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProfile {
    pub name: String,
    pub driver_memory: String,
    pub num_executors: u32,
    pub executor_cores: u32,
    pub executor_memory: String,
    pub action_on_failure: ActionOnFailure,
}

impl StepProfile {
    /// Build from configuration
    pub fn from_config(step: &StepConfig, action_on_failure: ActionOnFailure) -> Self {
        Self {
            name: DEFAULT_STEP_NAME.to_string(),
            driver_memory: step.driver_memory.clone(),
            num_executors: step.num_executors,
            executor_cores: step.executor_cores,
            executor_memory: step.executor_memory.clone(),
            action_on_failure,
        }
    }

    /// Submit-command arguments for a cluster-mode step
    pub fn to_args(&self, staged: &StagedRef) -> Vec<String> {
        let mut args = vec![
            "spark-submit".to_string(),
            "--deploy-mode".to_string(),
            "cluster".to_string(),
            "--driver-memory".to_string(),
            self.driver_memory.clone(),
            "--num-executors".to_string(),
            self.num_executors.to_string(),
            "--executor-cores".to_string(),
            self.executor_cores.to_string(),
            "--executor-memory".to_string(),
            self.executor_memory.clone(),
        ];

        if let Some(config) = staged.artifact(CONFIG_ARTIFACT) {
            args.push("--files".to_string());
            args.push(config);
        }
        if let Some(step) = staged.artifact(STEP_ARTIFACT) {
            args.push(step);
        }
        args
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    ProvisioningFailed { message: String },
    StagingFailed { message: String },
    SubmissionFailed { message: String },
    StepFailed { message: String },
    TimedOut { after_secs: u64 },
    Cancelled,
}

impl JobOutcome {
    /// Outcome state the machine enters for this result
    pub fn state(&self) -> ClusterState {
        match self {
            JobOutcome::Succeeded => ClusterState::Succeeded,
            JobOutcome::TimedOut { .. } => ClusterState::TimedOut,
            _ => ClusterState::Failed,
        }
    }

    /// Returns true if the step completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

/// Everything known about a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub cluster: ClusterHandle,
    pub step_id: Option<String>,
    pub outcome: JobOutcome,
    pub action_on_failure: ActionOnFailure,
    pub final_state: ClusterState,
    pub history: Vec<StateChange>,
    /// Set when `terminate` returned an error
    pub teardown_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// States visited, in order, starting from `Idle`
    pub fn states(&self) -> Vec<ClusterState> {
        std::iter::once(ClusterState::Idle)
            .chain(self.history.iter().map(|c| c.to))
            .collect()
    }

    /// Apply the failure policy
    ///
    /// A step failure under `Continue` is logged and accepted. A teardown
    /// error fails an otherwise successful run.
    pub fn into_result(self) -> Result<Self> {
        let step_id = self.step_id.clone().unwrap_or_default();
        let failure = match &self.outcome {
            JobOutcome::Succeeded => None,
            JobOutcome::StepFailed { message }
                if self.action_on_failure == ActionOnFailure::Continue =>
            {
                warn!(
                    step_id = %step_id,
                    reason = %message,
                    "Step failed; continuing as configured"
                );
                None
            }
            JobOutcome::StepFailed { message } => Some(Error::StepFailed {
                step_id,
                message: message.clone(),
            }),
            JobOutcome::TimedOut { after_secs } => Some(Error::StepTimedOut {
                step_id,
                timeout_secs: *after_secs,
            }),
            JobOutcome::Cancelled => Some(Error::Cancelled),
            JobOutcome::ProvisioningFailed { message } => Some(Error::Provisioning {
                message: message.clone(),
            }),
            JobOutcome::StagingFailed { message } => Some(Error::Staging {
                message: message.clone(),
            }),
            JobOutcome::SubmissionFailed { message } => Some(Error::Submission {
                message: message.clone(),
            }),
        };

        if let Some(error) = failure {
            return Err(error);
        }
        if let Some(message) = &self.teardown_error {
            return Err(Error::Teardown {
                cluster: self.cluster.to_string(),
                message: message.clone(),
            });
        }
        Ok(self)
    }
}
