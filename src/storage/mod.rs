//! Storage abstractions for crawl results.
//!
//! A run hands its finished rows to a [`ResultSink`] once, after the last
//! page was extracted.

pub mod csv;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::ExtractionResult;

pub use csv::CsvSink;

/// Metadata about a completed write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Rows written, header excluded
    pub rows: usize,
    /// Where the rows ended up
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

/// Destination for the rows of one run.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist all rows, in order.
    async fn write_results(&self, results: &[ExtractionResult]) -> Result<WriteMetadata>;
}
