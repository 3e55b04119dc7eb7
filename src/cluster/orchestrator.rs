//! Cluster orchestrator
//!
//! Drives one run through the lifecycle: provision, stage, submit, watch the
//! step, and always tear the cluster down. Teardown happens exactly once on
//! every path, including failures before a cluster id exists and
//! cancellation.

use super::provider::ClusterProvider;
use super::types::{
    Artifact, ClusterHandle, ClusterRequest, ClusterState, JobOutcome, RunReport, StateChange,
    StepHandle, StepProfile, StepStatus, CONFIG_ARTIFACT, STEP_ARTIFACT,
};
use crate::config::{LakeConfig, MonitorConfig};
use crate::error::{Error, Result};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Deadline used when the configured timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// ============================================================================
// Lifecycle
// ============================================================================

/// Current state plus every transition taken so far
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: ClusterState,
    history: Vec<StateChange>,
}

impl Lifecycle {
    /// Start in `Idle`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Move to `to`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, to: ClusterState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.history.push(StateChange {
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(())
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs the transformation step on a provider-managed cluster
pub struct ClusterOrchestrator {
    provider: Arc<dyn ClusterProvider>,
    request: ClusterRequest,
    step: StepProfile,
    monitor: MonitorConfig,
    artifacts: Vec<Artifact>,
    cancel: CancellationToken,
}

impl ClusterOrchestrator {
    /// Create an orchestrator with no artifacts to stage
    pub fn new(
        provider: Arc<dyn ClusterProvider>,
        request: ClusterRequest,
        step: StepProfile,
        monitor: MonitorConfig,
    ) -> Self {
        Self {
            provider,
            request,
            step,
            monitor,
            artifacts: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create an orchestrator for a job configuration
    ///
    /// Stages the configuration itself and a description of the step.
    pub fn from_config(provider: Arc<dyn ClusterProvider>, config: &LakeConfig) -> Result<Self> {
        let step = StepProfile::from_config(&config.step, config.cluster.action_on_failure);
        let config_yaml = serde_yaml::to_string(config)?;
        let step_json = serde_json::to_vec_pretty(&step)?;

        Ok(Self::new(
            provider,
            ClusterRequest::from(&config.cluster),
            step,
            config.monitor.clone(),
        )
        .with_artifact(Artifact::new(CONFIG_ARTIFACT, config_yaml))
        .with_artifact(Artifact::new(STEP_ARTIFACT, step_json)))
    }

    /// Add an artifact to stage
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn request(&self) -> &ClusterRequest {
        &self.request
    }

    pub fn step(&self) -> &StepProfile {
        &self.step
    }

    /// Run the job to completion and tear the cluster down
    ///
    /// Never returns early without calling `terminate`. Use
    /// [`RunReport::into_result`] to apply the failure policy.
    pub async fn run(&self) -> RunReport {
        let started_at = Utc::now();
        let mut lifecycle = Lifecycle::new();

        info!(
            provider = self.provider.name(),
            cluster = %self.request.name,
            nodes = self.request.node_count,
            "Starting cluster run"
        );

        let (cluster, step_id, outcome) = self.drive(&mut lifecycle).await;

        self.enter(&mut lifecycle, outcome.state());
        match &outcome {
            JobOutcome::Succeeded => info!(cluster = %cluster, "Step succeeded"),
            other => warn!(cluster = %cluster, outcome = ?other, "Run did not succeed"),
        }

        self.enter(&mut lifecycle, ClusterState::Terminating);
        let teardown_error = match self.provider.terminate(&cluster).await {
            Ok(()) => None,
            Err(e) => {
                error!(cluster = %cluster, error = %e, "Cluster teardown failed");
                Some(e.to_string())
            }
        };
        self.enter(&mut lifecycle, ClusterState::Terminated);

        RunReport {
            cluster,
            step_id,
            outcome,
            action_on_failure: self.step.action_on_failure,
            final_state: lifecycle.state(),
            history: lifecycle.history,
            teardown_error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Everything before the outcome; returns the handle to tear down
    async fn drive(
        &self,
        lifecycle: &mut Lifecycle,
    ) -> (ClusterHandle, Option<String>, JobOutcome) {
        let named = ClusterHandle::named(&self.request.name);

        self.enter(lifecycle, ClusterState::Provisioning);
        let cluster = match self.guarded(self.provider.provision(&self.request)).await {
            None => return (named, None, JobOutcome::Cancelled),
            Some(Err(e)) => {
                let outcome = JobOutcome::ProvisioningFailed {
                    message: e.to_string(),
                };
                return (named, None, outcome);
            }
            Some(Ok(handle)) => handle,
        };
        info!(cluster = %cluster, "Cluster provisioned");

        self.enter(lifecycle, ClusterState::Staging);
        let staged = match self
            .guarded(self.provider.stage(&cluster, &self.artifacts))
            .await
        {
            None => return (cluster, None, JobOutcome::Cancelled),
            Some(Err(e)) => {
                let outcome = JobOutcome::StagingFailed {
                    message: e.to_string(),
                };
                return (cluster, None, outcome);
            }
            Some(Ok(staged)) => staged,
        };
        debug!(location = %staged.location, artifacts = ?staged.artifacts, "Artifacts staged");

        self.enter(lifecycle, ClusterState::Submitting);
        let step = match self
            .guarded(self.provider.submit_step(&cluster, &staged, &self.step))
            .await
        {
            None => return (cluster, None, JobOutcome::Cancelled),
            Some(Err(e)) => {
                let outcome = JobOutcome::SubmissionFailed {
                    message: e.to_string(),
                };
                return (cluster, None, outcome);
            }
            Some(Ok(step)) => step,
        };

        self.enter(lifecycle, ClusterState::Running);
        info!(
            step_id = %step.step_id,
            step = %self.step.name,
            action_on_failure = self.step.action_on_failure.as_provider_str(),
            "Step submitted"
        );

        self.enter(lifecycle, ClusterState::Monitoring);
        let outcome = self.watch(&step).await;
        (cluster, Some(step.step_id), outcome)
    }

    /// Poll until the step finishes, the deadline passes or the run is cancelled
    async fn watch(&self, step: &StepHandle) -> JobOutcome {
        let timeout = self.monitor.timeout();
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        let after_secs = timeout.as_secs();
        let max_errors = self.monitor.max_poll_errors.max(1);
        let mut consecutive_errors = 0;

        loop {
            let polled = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return JobOutcome::Cancelled,
                () = sleep_until(deadline) => return JobOutcome::TimedOut { after_secs },
                polled = self.provider.poll(step) => polled,
            };

            match polled {
                Ok(StepStatus::Succeeded) => return JobOutcome::Succeeded,
                Ok(StepStatus::Failed { reason }) => {
                    return JobOutcome::StepFailed { message: reason };
                }
                Ok(status) => {
                    consecutive_errors = 0;
                    debug!(step_id = %step.step_id, status = ?status, "Step still active");
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        step_id = %step.step_id,
                        attempt = consecutive_errors,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Failed to poll step status"
                    );
                    if !e.is_retryable() {
                        return JobOutcome::StepFailed {
                            message: format!("status unavailable: {e}"),
                        };
                    }
                    if consecutive_errors >= max_errors {
                        return JobOutcome::StepFailed {
                            message: format!(
                                "status unavailable after {consecutive_errors} consecutive poll errors: {e}"
                            ),
                        };
                    }
                }
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return JobOutcome::Cancelled,
                () = sleep_until(deadline) => return JobOutcome::TimedOut { after_secs },
                () = sleep(self.monitor.poll_interval()) => {}
            }
        }
    }

    /// Await `fut` unless the run is cancelled first
    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Option<Result<T>> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = fut => Some(result),
        }
    }

    fn enter(&self, lifecycle: &mut Lifecycle, to: ClusterState) {
        let from = lifecycle.state();
        match lifecycle.advance(to) {
            Ok(()) => info!(
                cluster = %self.request.name,
                from = from.as_label(),
                to = to.as_label(),
                "Cluster state changed"
            ),
            Err(e) => error!(cluster = %self.request.name, error = %e, "Transition rejected"),
        }
    }
}
