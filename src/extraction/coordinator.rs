//! Extraction phase runner
//!
//! Reads the discovery hand-off, extracts every URL with bounded concurrency
//! and reports records and failures to an `OutputHandler` as they complete.

use crate::extraction::engine::{ExtractionEngine, ExtractionOutcome};
use crate::model::Phase;
use crate::output::{OutputError, OutputHandler, PhaseCounters, PhaseSummary};
use crate::{HarvestError, Result};
use futures::StreamExt;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reads a newline-delimited URL list
///
/// Blank lines and `#` comments are skipped, duplicates keep their first
/// position.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - At least one URL
/// * `Err(HarvestError::EmptyInput)` - The file holds no URLs
/// * `Err(HarvestError::Io)` - The file could not be read
pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;

    let mut seen = HashSet::new();
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(HarvestError::EmptyInput {
            path: path.display().to_string(),
        });
    }
    Ok(urls)
}

/// Runs the extraction phase over a URL list
pub struct ExtractionRun {
    engine: Arc<ExtractionEngine>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl ExtractionRun {
    pub fn new(engine: Arc<ExtractionEngine>, concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Extracts every URL and reports each outcome to `output`
    ///
    /// Individual failures never abort the phase; only an output write error
    /// does. When cancelled, URLs not yet started are skipped and in-flight
    /// ones finish or resolve as cancelled.
    pub async fn run(&self, urls: Vec<String>, output: &dyn OutputHandler) -> Result<PhaseSummary> {
        let started = Instant::now();
        let total = urls.len();
        let counters = PhaseCounters::new();
        let write_error: Mutex<Option<OutputError>> = Mutex::new(None);

        tracing::info!(
            "Extracting {} product URLs with concurrency {}",
            total,
            self.concurrency
        );

        futures::stream::iter(urls)
            .take_until(self.cancel.cancelled())
            .for_each_concurrent(self.concurrency, |url| {
                let counters = &counters;
                let write_error = &write_error;
                async move {
                    let written = match self.engine.extract(&url).await {
                        ExtractionOutcome::Extracted { record, attempts } => {
                            counters.record_success(attempts);
                            output.record_product(&record)
                        }
                        ExtractionOutcome::Failed(failure) => {
                            counters.record_failure(failure.attempts_made);
                            output.record_failure(&failure)
                        }
                        ExtractionOutcome::Cancelled => {
                            tracing::debug!("Extraction of {} cancelled", url);
                            Ok(())
                        }
                    };

                    if let Err(e) = written {
                        tracing::error!("Failed to write output for {}: {}", url, e);
                        if let Ok(mut slot) = write_error.lock() {
                            slot.get_or_insert(e);
                        }
                    }

                    let done = counters.snapshot(Phase::Extraction, started.elapsed()).processed;
                    if done % 50 == 0 {
                        tracing::info!("Progress: {}/{} product URLs", done, total);
                    }
                }
            })
            .await;

        output.finalize()?;

        let first_error = write_error.lock().ok().and_then(|mut slot| slot.take());
        if let Some(e) = first_error {
            return Err(e.into());
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("Extraction cancelled; partial results were written");
        }

        Ok(counters.snapshot(Phase::Extraction, started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_url_list_dedups_and_skips_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product_urls.txt");
        tokio::fs::write(
            &path,
            "# discovered\nhttps://a/uk/tvs/x\n\nhttps://a/uk/tvs/y\nhttps://a/uk/tvs/x\n",
        )
        .await
        .unwrap();

        let urls = read_url_list(&path).await.unwrap();
        assert_eq!(urls, vec!["https://a/uk/tvs/x", "https://a/uk/tvs/y"]);
    }

    #[tokio::test]
    async fn test_empty_url_list_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("product_urls.txt");
        tokio::fs::write(&path, "\n# nothing\n").await.unwrap();

        let err = read_url_list(&path).await.unwrap_err();
        assert!(matches!(err, HarvestError::EmptyInput { .. }));
    }
}
