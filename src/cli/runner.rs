//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::cluster::{
    ClusterOrchestrator, ClusterProvider, ClusterRequest, LocalProvider, StagedRef, StepProfile,
    CONFIG_ARTIFACT, STEP_ARTIFACT,
};
use crate::config::{load_config, validate_config, LakeConfig};
use crate::error::Result;
use crate::output::summarize_table;
use crate::pipeline::Pipeline;
use crate::store::LakeStore;
use crate::types::Table;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel the cluster run when this token fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                poll_interval_secs,
                timeout_secs,
            } => self.run_cluster(*poll_interval_secs, *timeout_secs).await,
            Commands::Transform {
                run_id,
                rejection_samples,
            } => self.transform(run_id.as_deref(), *rejection_samples).await,
            Commands::Plan => self.plan(),
            Commands::Validate => self.validate(),
            Commands::Summary { table } => self.summary(*table).await,
        }
    }

    /// Load the job configuration
    fn load_config(&self) -> Result<LakeConfig> {
        load_config(&self.cli.config)
    }

    /// Orchestrated run on a cluster
    async fn run_cluster(
        &self,
        poll_interval_secs: Option<u64>,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(secs) = poll_interval_secs {
            config.monitor.poll_interval_secs = secs;
        }
        if let Some(secs) = timeout_secs {
            config.monitor.timeout_secs = secs;
        }
        validate_config(&config)?;

        let staging = LakeStore::parse(&config.staging_root())?;
        let local = Arc::new(LocalProvider::new(staging));
        let provider: Arc<dyn ClusterProvider> = Arc::clone(&local) as Arc<dyn ClusterProvider>;

        let orchestrator = ClusterOrchestrator::from_config(provider, &config)?
            .with_cancellation(self.cancel.clone());
        let report = orchestrator.run().await;

        let pipeline = match &report.step_id {
            Some(step_id) => local.step_report(step_id).await,
            None => None,
        };
        self.output_message(&json!({
            "type": "RUN_REPORT",
            "report": report,
            "pipeline": pipeline,
        }));

        report.into_result().map(|_| ())
    }

    /// In-process transformation step
    async fn transform(&self, run_id: Option<&str>, rejection_samples: usize) -> Result<()> {
        let config = self.load_config()?;
        let mut pipeline = Pipeline::from_config(&config)?.with_rejection_samples(rejection_samples);
        if let Some(run_id) = run_id {
            pipeline = pipeline.with_run_id(run_id);
        }

        let report = pipeline.run().await?;
        self.output_message(&json!({
            "type": "PIPELINE_REPORT",
            "report": report,
        }));
        Ok(())
    }

    /// Print what a cluster run would do
    fn plan(&self) -> Result<()> {
        let config = self.load_config()?;
        let request = ClusterRequest::from(&config.cluster);
        let step = StepProfile::from_config(&config.step, config.cluster.action_on_failure);
        let staged = StagedRef {
            location: format!(
                "{}/{}",
                config.staging_root().trim_end_matches('/'),
                request.name
            ),
            artifacts: vec![CONFIG_ARTIFACT.to_string(), STEP_ARTIFACT.to_string()],
        };

        self.output_message(&json!({
            "type": "PLAN",
            "cluster": request,
            "step": {
                "name": step.name,
                "action_on_failure": step.action_on_failure.as_provider_str(),
                "args": step.to_args(&staged),
            },
            "monitor": config.monitor,
        }));
        Ok(())
    }

    /// Validate the job configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration '{}' is valid: {} -> {} ({} workers)",
                    self.cli.config.display(),
                    config.log_root,
                    config.bucket,
                    config.cluster.node_count
                )
            }
        }));
        self.output_message(&json!({
            "type": "CONFIG",
            "config": config,
        }));
        Ok(())
    }

    /// Summarize committed tables
    async fn summary(&self, table: Option<Table>) -> Result<()> {
        let config = self.load_config()?;
        let store = LakeStore::parse(&config.bucket)?;
        let tables = table.map_or_else(|| Table::ALL.to_vec(), |t| vec![t]);

        for table in tables {
            let summary = summarize_table(&store, table).await?;
            info!(table = %table, partitions = summary.partitions, rows = summary.rows, "Table summary");
            self.output_message(&json!({
                "type": "TABLE_SUMMARY",
                "summary": summary,
            }));
        }
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
