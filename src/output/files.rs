//! File-backed output handler
//!
//! Layout inside the output directory (names are configurable):
//! - `products.ndjson` - one `ProductRecord` per line (extraction)
//! - `failed_listing_urls.txt` / `failed_urls.txt` - quarantined URLs per phase
//! - `failures.ndjson` - failure ledger shared by both phases

use crate::config::OutputConfig;
use crate::model::{FailureRecord, ProductRecord};
use crate::output::sink::AppendLog;
use crate::output::traits::{OutputError, OutputHandler, OutputResult};
use std::fs;
use std::path::Path;

/// Output handler writing append-only files
pub struct FileOutput {
    records: Option<AppendLog>,
    quarantine: AppendLog,
    ledger: AppendLog,
}

impl FileOutput {
    /// Output for the discovery phase
    ///
    /// Discovery starts a run, so the failure ledger is recreated.
    pub fn for_discovery(config: &OutputConfig) -> OutputResult<Self> {
        Ok(Self {
            records: None,
            quarantine: AppendLog::create(&config.path_of(&config.failed_listings))?,
            ledger: AppendLog::create(&config.path_of(&config.failure_ledger))?,
        })
    }

    /// Output for the extraction phase
    ///
    /// Ledger entries are appended after those left by discovery.
    pub fn for_extraction(config: &OutputConfig) -> OutputResult<Self> {
        Ok(Self {
            records: Some(AppendLog::create(&config.path_of(&config.records))?),
            quarantine: AppendLog::create(&config.path_of(&config.failed_urls))?,
            ledger: AppendLog::append_to(&config.path_of(&config.failure_ledger))?,
        })
    }
}

impl OutputHandler for FileOutput {
    fn record_product(&self, record: &ProductRecord) -> OutputResult<()> {
        match &self.records {
            Some(records) => records.append_json(record),
            None => Err(OutputError::Write(
                "discovery output does not accept product records".to_string(),
            )),
        }
    }

    fn record_failure(&self, failure: &FailureRecord) -> OutputResult<()> {
        self.quarantine.append_line(&failure.url)?;
        self.ledger.append_json(failure)
    }

    fn finalize(&self) -> OutputResult<()> {
        if let Some(records) = &self.records {
            records.flush()?;
        }
        self.quarantine.flush()?;
        self.ledger.flush()
    }
}

/// Reads a failure ledger back
pub fn read_ledger(path: &Path) -> OutputResult<Vec<FailureRecord>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(OutputError::from))
        .collect()
}
