//! Discovery phase: sitemap → category listings → product URLs
//!
//! The phase ends by writing the hand-off consumed by extraction:
//! - `product_urls.txt` - one validated product URL per line, sorted
//! - `url_metadata.json` - provenance of every URL plus run figures

mod coordinator;
mod parser;
mod sitemap;

pub use coordinator::{DiscoveryReport, DiscoveryRun, HandOffPaths};
pub use parser::{parse_sitemap, SitemapDocument, SitemapKind};
pub use sitemap::SitemapNavigator;

use crate::concurrency::ConcurrencyController;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::output::FileOutput;
use crate::pagination::{PaginationResolver, RunSignals};
use crate::retry::RetryPolicy;
use crate::url::SiteRules;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete discovery phase
///
/// This is the main entry point for discovery. It will:
/// 1. Build the classifier, controller and fetch layer from the configuration
/// 2. Walk the sitemap and add fallback hubs
/// 3. Resolve the pagination of every listing
/// 4. Write the product URL list, the metadata file and the failure ledger
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `concurrency` - Number of listings resolved at once
/// * `cancel` - Stops taking new listings and closes the controller
pub async fn run_discovery(
    config: &Config,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<DiscoveryReport> {
    let rules = Arc::new(SiteRules::from_config(&config.site)?);
    let controller = Arc::new(ConcurrencyController::new(&config.concurrency));
    controller.close_on(cancel.clone());

    let fetcher = Arc::new(Fetcher::from_config(config, Arc::clone(&controller)).await?);
    let retry = RetryPolicy::from_config(&config.retry);
    let resolver = Arc::new(
        PaginationResolver::new(
            Arc::clone(&rules),
            &config.site,
            &config.pagination,
            retry.clone(),
            Arc::new(RunSignals::new()),
        )
        .with_controller(controller),
    );
    let navigator = SitemapNavigator::new(Arc::clone(&fetcher), Arc::clone(&rules), &config.site);

    let output = FileOutput::for_discovery(&config.output)?;
    let paths = HandOffPaths {
        product_urls: config.output.path_of(&config.output.product_urls),
        url_metadata: config.output.path_of(&config.output.url_metadata),
    };

    DiscoveryRun::new(navigator, resolver, fetcher, rules, retry, concurrency, cancel)
        .run(&output, &paths)
        .await
}
