//! Extraction phase: product page → validated `ProductRecord`
//!
//! Each page is parsed from its embedded JSON-LD first; any field the
//! structured data leaves empty is filled from the selector fallback lists.
//! The merged fields are normalized and validated before a record is emitted.

mod coordinator;
mod engine;
mod normalize;
mod selectors;
mod structured;
mod validate;

pub use coordinator::{read_url_list, ExtractionRun};
pub use engine::{ExtractionEngine, ExtractionOutcome};
pub use normalize::{
    absolutize, currency_from_text, normalize_availability, normalize_description, parse_price,
    DESCRIPTION_LIMIT,
};
pub use selectors::selector_fields;
pub use structured::{find_product, has_structured_product, product_fields};
pub use validate::{build_record, ExtractFailure, RecordPolicy};

use crate::concurrency::ConcurrencyController;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::output::{read_metadata, FileOutput, PhaseSummary};
use crate::retry::RetryPolicy;
use crate::url::SiteRules;
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete extraction phase
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `input` - Newline-delimited product URL list
/// * `metadata` - Optional discovery metadata used as category hints
/// * `concurrency` - Number of product URLs extracted at once
/// * `cancel` - Stops taking new URLs and closes the controller
///
/// # Returns
///
/// * `Ok(PhaseSummary)` - Every URL ended as a record or a ledger entry
/// * `Err(HarvestError)` - Empty or unreadable input, or an output write failure
pub async fn run_extraction(
    config: &Config,
    input: &Path,
    metadata: Option<&Path>,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<PhaseSummary> {
    let urls = read_url_list(input).await?;

    let rules = Arc::new(SiteRules::from_config(&config.site)?);
    let controller = Arc::new(ConcurrencyController::new(&config.concurrency));
    controller.close_on(cancel.clone());
    let fetcher = Arc::new(Fetcher::from_config(config, controller).await?);

    let mut engine = ExtractionEngine::new(
        fetcher,
        rules,
        RecordPolicy::from_site(&config.site),
        RetryPolicy::from_config(&config.retry),
    );
    if let Some(path) = metadata {
        match read_metadata(path) {
            Ok(metadata) => {
                tracing::info!("Using {} metadata entries as category hints", metadata.urls.len());
                engine = engine.with_hints(metadata.urls);
            }
            Err(e) => tracing::warn!("Ignoring metadata {}: {}", path.display(), e),
        }
    }

    let output = FileOutput::for_extraction(&config.output)?;
    ExtractionRun::new(Arc::new(engine), concurrency, cancel)
        .run(urls, &output)
        .await
}

/// Raw field values read from a page, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub availability: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub model_code: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub brand: Option<String>,
}

impl PartialProduct {
    /// Fills every empty field from `fallback`
    pub fn or(self, fallback: PartialProduct) -> PartialProduct {
        PartialProduct {
            name: self.name.or(fallback.name),
            sku: self.sku.or(fallback.sku),
            price: self.price.or(fallback.price),
            currency: self.currency.or(fallback.currency),
            availability: self.availability.or(fallback.availability),
            image_url: self.image_url.or(fallback.image_url),
            description: self.description.or(fallback.description),
            model_code: self.model_code.or(fallback.model_code),
            category: self.category.or(fallback.category),
            sub_category: self.sub_category.or(fallback.sub_category),
            brand: self.brand.or(fallback.brand),
        }
    }

    /// Whether the fields required for a record are all present
    pub fn has_required(&self) -> bool {
        self.name.is_some() && self.sku.is_some() && self.price.is_some()
    }
}
