//! Cluster orchestration
//!
//! The transformation step runs on rented compute. [`ClusterOrchestrator`]
//! drives one run through the [`ClusterState`] machine against any
//! [`ClusterProvider`]; [`LocalProvider`] runs the step in-process.

mod local;
mod orchestrator;
mod provider;
mod types;


pub use local::LocalProvider;
pub use orchestrator::{ClusterOrchestrator, Lifecycle};
pub use provider::ClusterProvider;
pub use types::{
    Artifact, ClusterHandle, ClusterRequest, ClusterState, JobOutcome, RunReport, StagedRef,
    StateChange, StepHandle, StepProfile, StepStatus, CONFIG_ARTIFACT, DEFAULT_STEP_NAME,
    STEP_ARTIFACT,
};
