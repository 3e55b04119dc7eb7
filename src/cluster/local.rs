//! In-process cluster provider
//!
//! Runs the transformation step as a tokio task on the current machine.
//! Artifacts are staged to a [`LakeStore`] and the step reads its
//! configuration back from there, so the same path is exercised as with a
//! rented cluster.

use super::provider::ClusterProvider;
use super::types::{
    Artifact, ClusterHandle, ClusterRequest, StagedRef, StepHandle, StepProfile, StepStatus,
    CONFIG_ARTIFACT,
};
use crate::config::load_config_from_str;
use crate::error::{Error, Result, ResultExt};
use crate::pipeline::{Pipeline, PipelineReport};
use crate::store::LakeStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A provisioned local "cluster"
#[derive(Debug)]
struct LocalCluster {
    name: String,
    /// Staging directory below the staging root, once staged
    staged_dir: Option<String>,
}

enum LocalStep {
    Active {
        cluster_id: String,
        task: JoinHandle<Result<PipelineReport>>,
    },
    Done {
        status: StepStatus,
        report: Option<PipelineReport>,
    },
}

/// Provider that runs the step on the local tokio runtime
pub struct LocalProvider {
    staging: LakeStore,
    pipeline: Option<Pipeline>,
    next_id: AtomicU64,
    clusters: Mutex<HashMap<String, LocalCluster>>,
    steps: Mutex<HashMap<String, LocalStep>>,
}

impl LocalProvider {
    /// Create a provider staging artifacts below `staging`
    pub fn new(staging: LakeStore) -> Self {
        Self {
            staging,
            pipeline: None,
            next_id: AtomicU64::new(1),
            clusters: Mutex::new(HashMap::new()),
            steps: Mutex::new(HashMap::new()),
        }
    }

    /// Run this pipeline instead of one built from the staged configuration
    ///
    /// The staged configuration is still read and validated.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Report of a finished step
    pub async fn step_report(&self, step_id: &str) -> Option<PipelineReport> {
        match self.steps.lock().await.get(step_id)? {
            LocalStep::Done { report, .. } => report.clone(),
            LocalStep::Active { .. } => None,
        }
    }

    /// Number of clusters not yet terminated
    pub async fn live_clusters(&self) -> usize {
        self.clusters.lock().await.len()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn staged_dir(&self, cluster: &ClusterHandle) -> Result<String> {
        let id = cluster
            .id
            .as_deref()
            .ok_or_else(|| Error::provider(format!("cluster {cluster} was never provisioned")))?;
        let clusters = self.clusters.lock().await;
        let record = clusters
            .get(id)
            .ok_or_else(|| Error::provider(format!("unknown cluster {cluster}")))?;
        record
            .staged_dir
            .clone()
            .ok_or_else(|| Error::provider(format!("nothing staged for cluster {cluster}")))
    }
}

#[async_trait]
impl ClusterProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn provision(&self, request: &ClusterRequest) -> Result<ClusterHandle> {
        let id = self.next_id("local");
        self.clusters.lock().await.insert(
            id.clone(),
            LocalCluster {
                name: request.name.clone(),
                staged_dir: None,
            },
        );
        debug!(cluster = %request.name, id = %id, "Local cluster provisioned");
        Ok(ClusterHandle::new(&request.name, id))
    }

    async fn stage(&self, cluster: &ClusterHandle, artifacts: &[Artifact]) -> Result<StagedRef> {
        let id = cluster
            .id
            .clone()
            .ok_or_else(|| Error::provider(format!("cluster {cluster} was never provisioned")))?;
        let dir = format!("{}/{id}", cluster.name);

        let mut names = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            self.staging
                .put(&format!("{dir}/{}", artifact.name), artifact.data.clone())
                .await
                .map_err(|e| Error::Staging {
                    message: format!("{}: {e}", artifact.name),
                })?;
            names.push(artifact.name.clone());
        }

        match self.clusters.lock().await.get_mut(&id) {
            Some(record) => record.staged_dir = Some(dir.clone()),
            None => return Err(Error::provider(format!("unknown cluster {cluster}"))),
        }

        Ok(StagedRef {
            location: self.staging.display_key(&dir),
            artifacts: names,
        })
    }

    async fn submit_step(
        &self,
        cluster: &ClusterHandle,
        staged: &StagedRef,
        step: &StepProfile,
    ) -> Result<StepHandle> {
        let dir = self.staged_dir(cluster).await?;
        let raw = self.staging.get(&format!("{dir}/{CONFIG_ARTIFACT}")).await?;
        let yaml = std::str::from_utf8(&raw)
            .map_err(|e| Error::Submission {
                message: format!("staged {CONFIG_ARTIFACT} is not UTF-8: {e}"),
            })?;
        let config = load_config_from_str(yaml).context("staged configuration")?;

        let pipeline = match &self.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => Pipeline::from_config(&config)?,
        };

        let step_id = self.next_id("step");
        info!(
            step_id = %step_id,
            step = %step.name,
            args = %step.to_args(staged).join(" "),
            "Running step locally"
        );
        let task = tokio::spawn(async move { pipeline.run().await });

        self.steps.lock().await.insert(
            step_id.clone(),
            LocalStep::Active {
                cluster_id: cluster.id.clone().unwrap_or_default(),
                task,
            },
        );

        Ok(StepHandle {
            cluster: cluster.clone(),
            step_id,
        })
    }

    async fn poll(&self, step: &StepHandle) -> Result<StepStatus> {
        let mut steps = self.steps.lock().await;
        let finished = match steps.get(&step.step_id) {
            None => {
                return Err(Error::provider(format!("unknown step {}", step.step_id)));
            }
            Some(LocalStep::Done { status, .. }) => return Ok(status.clone()),
            Some(LocalStep::Active { task, .. }) => task.is_finished(),
        };
        if !finished {
            return Ok(StepStatus::Running);
        }

        let Some(LocalStep::Active { task, .. }) = steps.remove(&step.step_id) else {
            return Err(Error::provider(format!("unknown step {}", step.step_id)));
        };
        let (status, report) = match task.await {
            Ok(Ok(report)) => (StepStatus::Succeeded, Some(report)),
            Ok(Err(e)) => (StepStatus::Failed { reason: e.to_string() }, None),
            Err(e) if e.is_cancelled() => (
                StepStatus::Failed {
                    reason: "step aborted".to_string(),
                },
                None,
            ),
            Err(e) => (StepStatus::Failed { reason: e.to_string() }, None),
        };
        steps.insert(
            step.step_id.clone(),
            LocalStep::Done {
                status: status.clone(),
                report,
            },
        );
        Ok(status)
    }

    async fn terminate(&self, cluster: &ClusterHandle) -> Result<()> {
        let removed: Vec<String> = {
            let mut clusters = self.clusters.lock().await;
            let ids: Vec<String> = clusters
                .iter()
                .filter(|(id, record)| match &cluster.id {
                    Some(wanted) => *id == wanted,
                    None => record.name == cluster.name,
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                clusters.remove(id);
            }
            ids
        };

        let mut steps = self.steps.lock().await;
        for (step_id, entry) in steps.iter_mut() {
            if let LocalStep::Active { cluster_id, task } = entry {
                if removed.contains(cluster_id) && !task.is_finished() {
                    warn!(step_id = %step_id, "Aborting step of terminated cluster");
                    task.abort();
                }
            }
        }

        info!(cluster = %cluster, released = removed.len(), "Local cluster terminated");
        Ok(())
    }
}
