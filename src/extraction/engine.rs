//! Extraction engine: fetch, parse, normalize and validate one product page

use crate::extraction::selectors::selector_fields;
use crate::extraction::structured::{find_product_in, product_fields};
use crate::extraction::validate::{build_record, ExtractFailure, RecordPolicy};
use crate::extraction::PartialProduct;
use crate::fetch::{FetchMode, Fetcher};
use crate::model::{DiscoveredUrl, FailureRecord, Phase, ProductRecord};
use crate::retry::RetryPolicy;
use crate::url::{normalize_url, SiteRules};
use crate::FetchError;
use scraper::Html;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Final result of extracting one URL
#[derive(Debug)]
pub enum ExtractionOutcome {
    Extracted {
        record: ProductRecord,
        attempts: u32,
    },
    Failed(FailureRecord),
    /// The run was cancelled before the URL finished
    Cancelled,
}

/// Turns product URLs into validated records
pub struct ExtractionEngine {
    fetcher: Arc<Fetcher>,
    rules: Arc<SiteRules>,
    policy: RecordPolicy,
    retry: RetryPolicy,
    /// Discovery provenance keyed by normalized URL
    hints: HashMap<String, DiscoveredUrl>,
}

impl ExtractionEngine {
    pub fn new(
        fetcher: Arc<Fetcher>,
        rules: Arc<SiteRules>,
        policy: RecordPolicy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            rules,
            policy,
            retry,
            hints: HashMap::new(),
        }
    }

    /// Uses discovery metadata as category hints
    pub fn with_hints(mut self, entries: Vec<DiscoveredUrl>) -> Self {
        self.hints = entries
            .into_iter()
            .map(|entry| (entry.url.clone(), entry))
            .collect();
        self
    }

    /// Extracts one product URL, retrying the whole cycle on retryable failures
    ///
    /// Never fails the run: terminal and retry-exhausted failures come back
    /// as a `FailureRecord` carrying the number of attempts made.
    pub async fn extract(&self, raw_url: &str) -> ExtractionOutcome {
        let url = match self.canonical(raw_url) {
            Ok(url) => url,
            Err(reason) => {
                tracing::warn!("Quarantining {}: {}", raw_url, reason);
                return ExtractionOutcome::Failed(FailureRecord {
                    url: raw_url.to_string(),
                    phase: Phase::Extraction,
                    reason,
                    attempts_made: 1,
                });
            }
        };

        let (result, attempts) = self
            .retry
            .run(|_attempt| self.extract_once(&url), ExtractFailure::is_retryable)
            .await;

        match result {
            Ok(record) => {
                tracing::debug!("Extracted {} after {} attempt(s)", url, attempts);
                ExtractionOutcome::Extracted { record, attempts }
            }
            Err(ExtractFailure::Fetch(FetchError::Cancelled { .. })) => ExtractionOutcome::Cancelled,
            Err(e) => {
                tracing::warn!("Quarantining {} after {} attempt(s): {}", url, attempts, e);
                ExtractionOutcome::Failed(FailureRecord {
                    url,
                    phase: Phase::Extraction,
                    reason: e.to_string(),
                    attempts_made: attempts,
                })
            }
        }
    }

    /// One fetch-parse-validate cycle
    pub async fn extract_once(&self, url: &str) -> Result<ProductRecord, ExtractFailure> {
        let page = self.fetcher.fetch(url, FetchMode::Auto, true).await?;
        tracing::trace!("Fetched {} via the {} tier", url, page.tier);

        let fields = self.parse_page(url, &page.content);
        build_record(url, fields, &self.policy)
    }

    /// Reads every field from structured data, then selectors, then URL hints
    fn parse_page(&self, url: &str, content: &str) -> PartialProduct {
        let document = Html::parse_document(content);

        let structured = find_product_in(&document)
            .map(|product| product_fields(&product))
            .unwrap_or_default();
        let merged = structured.or(selector_fields(&document));

        merged.or(self.category_hint(url))
    }

    fn category_hint(&self, url: &str) -> PartialProduct {
        let (category, sub_category) = match self.hints.get(url) {
            Some(entry) if entry.category.is_some() => {
                (entry.category.clone(), entry.sub_category.clone())
            }
            _ => match Url::parse(url) {
                Ok(parsed) => self.rules.category_of(&parsed),
                Err(_) => (None, None),
            },
        };

        PartialProduct {
            category,
            sub_category,
            ..Default::default()
        }
    }

    fn canonical(&self, raw_url: &str) -> Result<String, String> {
        if let Some(url) = self.rules.canonicalize(raw_url, None) {
            return Ok(url.to_string());
        }
        normalize_url(raw_url)
            .map(|url| url.to_string())
            .map_err(|e| e.to_string())
    }
}
