//! Discovery phase runner
//!
//! Resolves every category listing concurrently and merges the product links
//! into a single ledger keyed by normalized URL. The first listing to report
//! a URL owns its provenance.

use crate::discovery::sitemap::SitemapNavigator;
use crate::fetch::Fetcher;
use crate::model::{DiscoveredUrl, DiscoverySource, FailureRecord, Phase};
use crate::output::{
    write_lines, write_metadata, OutputHandler, PhaseCounters, PhaseSummary, UrlMetadata,
};
use crate::pagination::{PaginationOutcome, PaginationResolver, Terminal};
use crate::retry::RetryPolicy;
use crate::url::{LinkClass, SiteRules};
use crate::{FetchError, Result};
use chrono::Utc;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Where the discovery hand-off is written
#[derive(Debug, Clone)]
pub struct HandOffPaths {
    pub product_urls: PathBuf,
    pub url_metadata: PathBuf,
}

/// Everything discovery produced
#[derive(Debug)]
pub struct DiscoveryReport {
    pub listings: Vec<DiscoveredUrl>,
    pub products: Vec<DiscoveredUrl>,
    pub summary: PhaseSummary,
}

/// Runs the discovery phase
pub struct DiscoveryRun {
    navigator: SitemapNavigator,
    resolver: Arc<PaginationResolver>,
    fetcher: Arc<Fetcher>,
    rules: Arc<SiteRules>,
    retry: RetryPolicy,
    concurrency: usize,
    cancel: CancellationToken,
}

impl DiscoveryRun {
    pub fn new(
        navigator: SitemapNavigator,
        resolver: Arc<PaginationResolver>,
        fetcher: Arc<Fetcher>,
        rules: Arc<SiteRules>,
        retry: RetryPolicy,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            navigator,
            resolver,
            fetcher,
            rules,
            retry,
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Discovers every product URL and writes the hand-off files
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveryReport)` - Listings, product URLs and the phase summary
    /// * `Err(HarvestError::NoSeeds)` - No category URL could be found
    /// * `Err(HarvestError::Output)` - An artifact could not be written
    pub async fn run(
        &self,
        output: &dyn OutputHandler,
        paths: &HandOffPaths,
    ) -> Result<DiscoveryReport> {
        let started = Instant::now();
        let listings = self.navigator.discover_category_urls().await?;

        let counters = PhaseCounters::new();
        let exhausted = AtomicU64::new(0);
        let ledger: Mutex<BTreeMap<String, DiscoveredUrl>> = Mutex::new(BTreeMap::new());

        tracing::info!(
            "Resolving {} listings with concurrency {}",
            listings.len(),
            self.concurrency
        );

        futures::stream::iter(listings.iter())
            .take_until(self.cancel.cancelled())
            .for_each_concurrent(self.concurrency, |listing| {
                let counters = &counters;
                let exhausted = &exhausted;
                let ledger = &ledger;
                async move {
                    let (result, attempts) = self
                        .retry
                        .run(
                            |_attempt| self.resolve_listing(&listing.url),
                            FetchError::is_transient,
                        )
                        .await;

                    let failure = match result {
                        Ok(outcome) if outcome.terminal.is_cancelled() => {
                            tracing::debug!("{} cancelled mid-expansion", listing.url);
                            None
                        }
                        Ok(outcome) => {
                            self.record_products(ledger, &outcome);
                            match outcome.terminal {
                                Terminal::Exhausted(reason) => {
                                    tracing::debug!("{} exhausted ({:?})", listing.url, reason);
                                    exhausted.fetch_add(1, Ordering::Relaxed);
                                    counters.record_success(attempts);
                                    None
                                }
                                Terminal::Error(e) => Some(FailureRecord {
                                    url: listing.url.clone(),
                                    phase: Phase::Discovery,
                                    reason: e.to_string(),
                                    attempts_made: outcome.state.attempts_made.max(1),
                                }),
                                Terminal::Cancelled => None,
                            }
                        }
                        Err(FetchError::Cancelled { .. }) => None,
                        Err(e) => Some(FailureRecord {
                            url: listing.url.clone(),
                            phase: Phase::Discovery,
                            reason: e.to_string(),
                            attempts_made: attempts,
                        }),
                    };

                    if let Some(failure) = failure {
                        tracing::warn!("Listing {} failed: {}", failure.url, failure.reason);
                        counters.record_failure(failure.attempts_made);
                        if let Err(e) = output.record_failure(&failure) {
                            tracing::error!("Failed to record listing failure: {}", e);
                        }
                    }
                }
            })
            .await;

        output.finalize()?;

        let products: Vec<DiscoveredUrl> = match ledger.into_inner() {
            Ok(map) => map.into_values().collect(),
            Err(poisoned) => poisoned.into_inner().into_values().collect(),
        };

        let mut summary = counters.snapshot(Phase::Discovery, started.elapsed());
        let completeness = if summary.processed == 0 {
            0.0
        } else {
            exhausted.load(Ordering::Relaxed) as f64 / summary.processed as f64
        };

        write_lines(
            &paths.product_urls,
            products
                .iter()
                .filter(|entry| entry.validated)
                .map(|entry| entry.url.as_str()),
        )?;

        let metadata = UrlMetadata::new(listings.clone(), products.clone(), completeness);
        write_metadata(&paths.url_metadata, &metadata)?;

        tracing::info!(
            "Discovery found {} product URLs across {} listings ({:.1}% complete)",
            products.len(),
            listings.len(),
            completeness * 100.0
        );
        if self.cancel.is_cancelled() {
            tracing::warn!("Discovery cancelled; the hand-off holds partial results");
        }

        summary.completeness = Some(completeness);
        summary.category_counts = metadata.category_counts;

        Ok(DiscoveryReport {
            listings,
            products,
            summary,
        })
    }

    async fn resolve_listing(
        &self,
        url: &str,
    ) -> std::result::Result<PaginationOutcome, FetchError> {
        let mut session = self.fetcher.open_listing(url).await?;
        Ok(self.resolver.resolve(session.as_mut()).await)
    }

    /// Adds a listing's product links; existing entries are left untouched
    fn record_products(
        &self,
        ledger: &Mutex<BTreeMap<String, DiscoveredUrl>>,
        outcome: &PaginationOutcome,
    ) {
        let Ok(mut ledger) = ledger.lock() else {
            tracing::error!("Discovery ledger lock poisoned");
            return;
        };

        for link in &outcome.product_links {
            if ledger.contains_key(link) {
                continue;
            }
            let Ok(url) = Url::parse(link) else { continue };
            let (category, sub_category) = self.rules.category_of(&url);
            ledger.insert(
                link.clone(),
                DiscoveredUrl {
                    url: link.clone(),
                    category,
                    sub_category,
                    source: DiscoverySource::PaginationExpansion,
                    discovered_at: Utc::now(),
                    validated: self.rules.classify_url(&url) == LinkClass::Product,
                },
            );
        }
    }
}
