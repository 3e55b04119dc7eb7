//! Extraction types

use crate::schema::RejectReason;
use serde::Serialize;

/// One item pulled from an extraction stream
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    /// A record that passed validation
    Record(T),
    /// A line that was skipped
    Rejected(Rejection),
}

impl<T> Extracted<T> {
    /// The record, if this item is one
    pub fn record(self) -> Option<T> {
        match self {
            Extracted::Record(record) => Some(record),
            Extracted::Rejected(_) => None,
        }
    }

    /// The rejection, if this item is one
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Extracted::Record(_) => None,
            Extracted::Rejected(rejection) => Some(rejection),
        }
    }
}

/// A skipped input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Storage location of the file
    pub file: String,
    /// 1-based line number (0 when the whole file is unreadable as text)
    pub line: usize,
    /// Why the line was skipped
    pub reason: RejectReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.reason)
    }
}

/// Counters kept by a consumer of an extraction stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    /// Files matched by the pattern
    pub files: usize,
    /// Records that passed validation
    pub records: usize,
    /// Lines skipped
    pub rejected: usize,
}

impl ExtractStats {
    /// Count one stream item
    pub fn observe<T>(&mut self, item: &Extracted<T>) {
        match item {
            Extracted::Record(_) => self.records += 1,
            Extracted::Rejected(_) => self.rejected += 1,
        }
    }
}
