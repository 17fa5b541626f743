//! Output handler trait and error types
//!
//! Both phases report their results through an `OutputHandler`: validated
//! records, quarantined URLs and terminal failures.

use crate::model::{FailureRecord, ProductRecord};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the results of a phase as they are produced
///
/// Implementations must be thread-safe; calls arrive from concurrent workers.
pub trait OutputHandler: Send + Sync {
    /// Records a validated product record
    fn record_product(&self, record: &ProductRecord) -> OutputResult<()>;

    /// Records a terminal failure
    ///
    /// The URL is quarantined and the entry appended to the failure ledger.
    fn record_failure(&self, failure: &FailureRecord) -> OutputResult<()>;

    /// Flushes everything written so far
    fn finalize(&self) -> OutputResult<()>;
}
