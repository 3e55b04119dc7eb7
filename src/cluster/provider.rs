//! Cluster provider trait
//!
//! A provider rents compute, stages files next to it, runs one step and
//! tears everything down again. The orchestrator only talks to this trait.

use super::types::{
    Artifact, ClusterHandle, ClusterRequest, StagedRef, StepHandle, StepProfile, StepStatus,
};
use crate::error::Result;
use async_trait::async_trait;

/// Backend that runs the transformation step on rented compute
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Create a cluster and wait until it accepts steps
    async fn provision(&self, request: &ClusterRequest) -> Result<ClusterHandle>;

    /// Copy artifacts to where the cluster can read them
    async fn stage(&self, cluster: &ClusterHandle, artifacts: &[Artifact]) -> Result<StagedRef>;

    /// Submit the transformation step
    async fn submit_step(
        &self,
        cluster: &ClusterHandle,
        staged: &StagedRef,
        step: &StepProfile,
    ) -> Result<StepHandle>;

    /// Current status of a submitted step
    async fn poll(&self, step: &StepHandle) -> Result<StepStatus>;

    /// Release every resource of the cluster
    ///
    /// Must accept a handle without an id and reclaim by name.
    async fn terminate(&self, cluster: &ClusterHandle) -> Result<()>;
}
