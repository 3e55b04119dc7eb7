//! The transformation step
//!
//! Extract both inputs, derive the star schema and write every table. This
//! is the unit of work a cluster step runs.
//!
//! Catalog files are read completely before the first event file, since
//! play events are matched against the catalog as they stream in.

mod types;


pub use types::{PipelineReport, DEFAULT_REJECTION_SAMPLES};

use crate::config::LakeConfig;
use crate::error::Result;
use crate::extract::{ExtractStats, Extracted, RecordExtractor};
use crate::output::{ParquetWriterConfig, PartitionedWriter};
use crate::schema::{RawLogRecord, RawSongRecord, SchemaRecord};
use crate::store::LakeStore;
use crate::transform::{StarSchema, StarSchemaBuilder};
use futures::StreamExt;
use std::time::Instant;
use tracing::info;

/// Runs extraction, transformation and writing for one job
#[derive(Debug, Clone)]
pub struct Pipeline {
    catalog: RecordExtractor,
    events: RecordExtractor,
    writer: PartitionedWriter,
    rejection_samples: usize,
}

impl Pipeline {
    /// Create a pipeline from its parts
    pub fn new(catalog: RecordExtractor, events: RecordExtractor, writer: PartitionedWriter) -> Self {
        Self {
            catalog,
            events,
            writer,
            rejection_samples: DEFAULT_REJECTION_SAMPLES,
        }
    }

    /// Build a pipeline from a job configuration
    pub fn from_config(config: &LakeConfig) -> Result<Self> {
        let catalog = RecordExtractor::new(LakeStore::parse(&config.catalog_root)?)
            .with_optional_pattern(config.catalog_pattern.as_deref())?;
        let events = RecordExtractor::new(LakeStore::parse(&config.log_root)?)
            .with_optional_pattern(config.log_pattern.as_deref())?;
        let writer = PartitionedWriter::new(
            LakeStore::parse(&config.bucket)?,
            ParquetWriterConfig::from(&config.parquet),
        );
        Ok(Self::new(catalog, events, writer))
    }

    /// Override the run id used in data file names
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.writer = self.writer.with_run_id(run_id);
        self
    }

    /// Set how many rejections the report keeps
    #[must_use]
    pub fn with_rejection_samples(mut self, limit: usize) -> Self {
        self.rejection_samples = limit;
        self
    }

    /// Extract and derive every table without writing anything
    pub async fn build(&self, report: &mut PipelineReport) -> Result<StarSchema> {
        let mut builder = StarSchemaBuilder::new();

        report.songs = self
            .drain::<RawSongRecord>(&self.catalog, report, |b, r| b.add_song(r), &mut builder)
            .await?;
        info!(
            records = report.songs.records,
            rejected = report.songs.rejected,
            files = report.songs.files,
            "Extracted song catalog"
        );

        report.events = self
            .drain::<RawLogRecord>(&self.events, report, |b, r| b.add_event(r), &mut builder)
            .await?;
        info!(
            records = report.events.records,
            rejected = report.events.rejected,
            files = report.events.files,
            "Extracted event log"
        );

        let (schema, stats) = builder.finish();
        report.transform = stats;
        Ok(schema)
    }

    async fn drain<T: SchemaRecord>(
        &self,
        extractor: &RecordExtractor,
        report: &mut PipelineReport,
        feed: impl Fn(&mut StarSchemaBuilder, &T),
        builder: &mut StarSchemaBuilder,
    ) -> Result<ExtractStats> {
        let files = extractor.files().await?;
        let mut stats = ExtractStats {
            files: files.len(),
            ..Default::default()
        };

        let mut items = extractor.extract_files::<T>(files);
        while let Some(item) = items.next().await {
            let item = item?;
            stats.observe(&item);
            match item {
                Extracted::Record(record) => feed(builder, &record),
                Extracted::Rejected(rejection) => {
                    report.sample_rejection(&rejection, self.rejection_samples);
                }
            }
        }
        Ok(stats)
    }

    /// Run the whole step
    ///
    /// A write failure stops the run; partitions committed before it keep
    /// their new contents and every other partition keeps its old one, so
    /// rerunning is safe.
    pub async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        let mut report = PipelineReport::new(self.writer.run_id());

        info!(run_id = %report.run_id, "Starting pipeline run");
        let schema = self.build(&mut report).await?;

        report.tables.push(self.writer.write_table(&schema.songs).await?);
        report.tables.push(self.writer.write_table(&schema.artists).await?);
        report.tables.push(self.writer.write_table(&schema.users).await?);
        report.tables.push(self.writer.write_table(&schema.time).await?);
        report.tables.push(self.writer.write_table(&schema.songplays).await?);

        report.set_duration(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));
        info!(
            run_id = %report.run_id,
            partitions = report.partitions_written(),
            rejected = report.rejected(),
            duration_ms = report.duration_ms,
            "Pipeline run complete"
        );
        Ok(report)
    }
}
