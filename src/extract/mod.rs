//! Record extraction from raw JSON-lines files
//!
//! A [`RecordExtractor`] lists every object under a storage root in key
//! order, keeps those matching its [`PathPattern`], and yields one
//! [`Extracted`] item per non-blank line. Lines that fail to parse or
//! validate come out as [`Rejection`]s; only storage failures end the stream
//! with an error.
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use songlake::extract::{Extracted, RecordExtractor};
//! use songlake::schema::RawLogRecord;
//!
//! let extractor = RecordExtractor::new(store).with_pattern("*.json")?;
//! let mut events = extractor.extract::<RawLogRecord>().await?;
//! while let Some(item) = events.next().await {
//!     if let Extracted::Record(event) = item? {
//!         println!("{}", event.page);
//!     }
//! }
//! ```

mod pattern;
mod types;

#[cfg(test)]
mod tests;

pub use pattern::{PathPattern, DEFAULT_PATTERN};
pub use types::{ExtractStats, Extracted, Rejection};

use crate::error::Result;
use crate::schema::{RejectReason, SchemaRecord};
use crate::store::LakeStore;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Stream of extracted items for one record type
pub type RecordStream<T> = BoxStream<'static, Result<Extracted<T>>>;

/// Reads typed records from one storage root
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    store: LakeStore,
    pattern: PathPattern,
}

impl RecordExtractor {
    /// Create an extractor over every `.json` object below `store`
    pub fn new(store: LakeStore) -> Self {
        Self {
            store,
            pattern: PathPattern::default(),
        }
    }

    /// Restrict extraction to keys matching a glob
    pub fn with_pattern(mut self, glob: &str) -> Result<Self> {
        self.pattern = PathPattern::new(glob)?;
        Ok(self)
    }

    /// Restrict extraction to an optional glob
    pub fn with_optional_pattern(self, glob: Option<&str>) -> Result<Self> {
        match glob {
            Some(glob) => self.with_pattern(glob),
            None => Ok(self),
        }
    }

    /// The active pattern
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Matching keys in lexicographic order
    pub async fn files(&self) -> Result<Vec<String>> {
        let keys = self.store.list(None).await?;
        Ok(keys
            .into_iter()
            .filter(|key| self.pattern.matches(key))
            .collect())
    }

    /// Stream every record of type `T` below the root
    ///
    /// Files are fetched one at a time as the stream is pulled. A file that
    /// cannot be read yields an error item; the caller decides whether to stop.
    pub async fn extract<T: SchemaRecord>(&self) -> Result<RecordStream<T>> {
        let files = self.files().await?;
        Ok(self.extract_files(files))
    }

    /// Stream every record of type `T` from an already listed set of keys
    pub fn extract_files<T: SchemaRecord>(&self, files: Vec<String>) -> RecordStream<T> {
        debug!(
            schema = T::schema().name,
            pattern = %self.pattern,
            files = files.len(),
            "Listed input files"
        );

        let store = self.store.clone();
        stream::iter(files)
            .then(move |key| {
                let store = store.clone();
                async move {
                    let location = store.display_key(&key);
                    let body = store.get(&key).await;
                    (location, body)
                }
            })
            .flat_map(|(location, body)| match body {
                Ok(bytes) => stream::iter(parse_file::<T>(&location, &bytes).into_iter().map(Ok))
                    .boxed(),
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            })
            .boxed()
    }

    /// Collect every record, dropping rejections after logging them
    pub async fn collect<T: SchemaRecord>(&self) -> Result<(Vec<T>, ExtractStats)> {
        let files = self.files().await?;
        let mut stats = ExtractStats {
            files: files.len(),
            ..Default::default()
        };
        let mut records = Vec::new();

        let mut items = self.extract_files::<T>(files);
        while let Some(item) = items.next().await {
            let item = item?;
            stats.observe(&item);
            if let Some(record) = item.record() {
                records.push(record);
            }
        }

        Ok((records, stats))
    }
}

/// Parse one file body into extracted items
pub fn parse_file<T: SchemaRecord>(location: &str, body: &[u8]) -> Vec<Extracted<T>> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(e) => {
            return vec![reject(
                location,
                0,
                RejectReason::MalformedJson {
                    message: format!("file is not valid UTF-8: {e}"),
                },
            )]
        }
    };

    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        items.push(parse_line::<T>(location, idx + 1, line));
    }

    debug!(file = location, items = items.len(), "Parsed input file");
    items
}

fn parse_line<T: SchemaRecord>(location: &str, line_no: usize, line: &str) -> Extracted<T> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return reject(
                location,
                line_no,
                RejectReason::MalformedJson {
                    message: e.to_string(),
                },
            )
        }
    };

    match T::schema().validate(&value) {
        Ok(validated) => Extracted::Record(T::from_validated(&validated)),
        Err(reason) => reject(location, line_no, reason),
    }
}

fn reject<T>(location: &str, line: usize, reason: RejectReason) -> Extracted<T> {
    let rejection = Rejection {
        file: location.to_string(),
        line,
        reason,
    };
    warn!(
        file = %rejection.file,
        line = rejection.line,
        reason = %rejection.reason,
        "Skipping invalid record"
    );
    Extracted::Rejected(rejection)
}
