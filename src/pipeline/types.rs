//! Pipeline report types

use crate::extract::{ExtractStats, Rejection};
use crate::output::TableWrite;
use crate::transform::TransformStats;
use crate::types::Table;
use serde::Serialize;

/// How many rejections a report keeps verbatim
pub const DEFAULT_REJECTION_SAMPLES: usize = 20;

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Run id used in data file names
    pub run_id: String,
    /// Catalog extraction counters
    pub songs: ExtractStats,
    /// Event extraction counters
    pub events: ExtractStats,
    /// Transform counters
    pub transform: TransformStats,
    /// Per-table write results, in write order
    pub tables: Vec<TableWrite>,
    /// First rejections seen, for diagnosis
    pub rejection_samples: Vec<Rejection>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Create an empty report for a run
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Rows written to a table
    pub fn rows(&self, table: Table) -> usize {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map_or(0, |t| t.rows)
    }

    /// Partitions written across all tables
    pub fn partitions_written(&self) -> usize {
        self.tables.iter().map(|t| t.partitions.len()).sum()
    }

    /// Records skipped across both inputs
    pub fn rejected(&self) -> usize {
        self.songs.rejected + self.events.rejected
    }

    /// Keep a rejection sample if there is room
    pub fn sample_rejection(&mut self, rejection: &Rejection, limit: usize) {
        if self.rejection_samples.len() < limit {
            self.rejection_samples.push(rejection.clone());
        }
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
