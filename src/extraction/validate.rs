//! Normalization and schema validation of extracted fields

use crate::config::SiteConfig;
use crate::extraction::normalize::{
    absolutize, currency_from_text, normalize_availability, normalize_description, parse_price,
};
use crate::extraction::PartialProduct;
use crate::model::ProductRecord;
use crate::FetchError;
use chrono::Utc;
use thiserror::Error;

/// Why a single extraction attempt did not produce a record
#[derive(Debug, Error)]
pub enum ExtractFailure {
    /// Fields were found but the record failed the schema; worth another attempt
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Required fields could not be located on the page
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ExtractFailure {
    /// Returns true if a fresh fetch-parse cycle may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Extraction(_) => false,
            Self::Fetch(e) => e.is_transient(),
        }
    }
}

/// Site-level defaults and the accepted currency codes
#[derive(Debug, Clone)]
pub struct RecordPolicy {
    pub brand: String,
    pub default_currency: String,
    pub known_currencies: Vec<String>,
}

impl RecordPolicy {
    pub fn from_site(site: &SiteConfig) -> Self {
        Self {
            brand: site.brand.clone(),
            default_currency: site.default_currency.clone(),
            known_currencies: site
                .known_currencies
                .iter()
                .map(|code| code.to_uppercase())
                .collect(),
        }
    }
}

/// Normalizes the merged fields and validates them into a record
///
/// # Arguments
///
/// * `url` - Normalized product page URL
/// * `fields` - Structured data merged with the selector fallback
/// * `policy` - Brand and currency defaults
///
/// # Returns
///
/// * `Ok(ProductRecord)` - Every required field present and valid
/// * `Err(ExtractFailure::Extraction)` - A required field is missing
/// * `Err(ExtractFailure::Validation)` - A field is present but invalid
pub fn build_record(
    url: &str,
    fields: PartialProduct,
    policy: &RecordPolicy,
) -> Result<ProductRecord, ExtractFailure> {
    let name = required(fields.name, "name")?;
    let sku = required(fields.sku, "sku")?;
    let price_text = required(fields.price, "price")?;

    let price_amount = parse_price(&price_text)
        .ok_or_else(|| ExtractFailure::Validation(format!("price {:?} is not numeric", price_text)))?;
    if !price_amount.is_finite() || price_amount < 0.0 {
        return Err(ExtractFailure::Validation(format!(
            "price {} is negative or not finite",
            price_amount
        )));
    }

    let currency = fields
        .currency
        .map(|code| code.trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .or_else(|| currency_from_text(&price_text))
        .unwrap_or_else(|| policy.default_currency.clone());
    if !policy.known_currencies.contains(&currency) {
        return Err(ExtractFailure::Validation(format!(
            "unknown currency {}",
            currency
        )));
    }

    Ok(ProductRecord {
        url: url.to_string(),
        sku,
        name,
        category: fields.category,
        sub_category: fields.sub_category,
        price_amount,
        currency,
        availability: normalize_availability(fields.availability.as_deref()),
        image_url: fields.image_url.and_then(|image| absolutize(&image, url)),
        description: fields
            .description
            .and_then(|text| normalize_description(&text)),
        model_code: fields.model_code,
        brand: fields
            .brand
            .filter(|brand| !brand.trim().is_empty())
            .unwrap_or_else(|| policy.brand.clone()),
        timestamp_utc: Utc::now(),
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, ExtractFailure> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExtractFailure::Extraction(format!("missing required field {}", field)))
}
