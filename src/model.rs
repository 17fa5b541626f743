//! Records produced and consumed by the two harvesting phases
//!
//! - `DiscoveredUrl` is written by discovery and never changed afterwards.
//! - `ProductRecord` is emitted by extraction once it has passed validation.
//! - `FailureRecord` is an append-only ledger entry for terminal failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a discovered URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Found by walking the sitemap tree
    Sitemap,
    /// Injected because its top-level section was missing from the sitemap
    FallbackHub,
    /// Revealed by expanding a listing page
    PaginationExpansion,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitemap => "sitemap",
            Self::FallbackHub => "fallback_hub",
            Self::PaginationExpansion => "pagination_expansion",
        }
    }
}

/// A URL found during the discovery phase
///
/// The `url` field is the normalized form and is the unique key across a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub source: DiscoverySource,
    pub discovered_at: DateTime<Utc>,
    /// Whether the URL re-classified as a product page when it was recorded
    pub validated: bool,
}

/// Stock status mapped onto a fixed vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    InStock,
    OutOfStock,
    PreOrder,
    BackOrder,
    LimitedAvailability,
    Discontinued,
    Unknown,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "InStock",
            Self::OutOfStock => "OutOfStock",
            Self::PreOrder => "PreOrder",
            Self::BackOrder => "BackOrder",
            Self::LimitedAvailability => "LimitedAvailability",
            Self::Discontinued => "Discontinued",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated product record, serialized as one NDJSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    #[serde(rename = "price_gbp")]
    pub price_amount: f64,
    pub currency: String,
    pub availability: Availability,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub model_code: Option<String>,
    pub brand: String,
    pub timestamp_utc: DateTime<Utc>,
}

/// Which phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Extraction,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => f.write_str("discovery"),
            Self::Extraction => f.write_str("extraction"),
        }
    }
}

/// Terminal failure entry in the failure ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub phase: Phase,
    pub reason: String,
    pub attempts_made: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> ProductRecord {
        ProductRecord {
            url: "https://www.samsung.com/uk/tvs/qled-tv/q80d-qe65q80datxxu".to_string(),
            sku: "QE65Q80DATXXU".to_string(),
            name: "65\" Q80D QLED 4K HDR Smart TV".to_string(),
            category: Some("tvs".to_string()),
            sub_category: Some("qled-tv".to_string()),
            price_amount: 1299.0,
            currency: "GBP".to_string(),
            availability: Availability::InStock,
            image_url: Some("https://images.samsung.com/q80d.jpg".to_string()),
            description: Some("Quantum processor 4K".to_string()),
            model_code: Some("QE65Q80DATXXU".to_string()),
            brand: "Samsung".to_string(),
            timestamp_utc: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_product_record_roundtrip() {
        let record = sample_record();
        let line = serde_json::to_string(&record).unwrap();
        let parsed: ProductRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_product_record_wire_field_names() {
        let value = serde_json::to_value(sample_record()).unwrap();
        let object = value.as_object().unwrap();

        for field in [
            "url",
            "sku",
            "name",
            "category",
            "sub_category",
            "price_gbp",
            "currency",
            "availability",
            "image_url",
            "description",
            "model_code",
            "brand",
            "timestamp_utc",
        ] {
            assert!(object.contains_key(field), "missing field {}", field);
        }
        assert_eq!(object.len(), 13);
        assert_eq!(object["availability"], "InStock");
    }

    #[test]
    fn test_discovery_source_serialization() {
        let json = serde_json::to_string(&DiscoverySource::FallbackHub).unwrap();
        assert_eq!(json, "\"fallback_hub\"");
        assert_eq!(DiscoverySource::FallbackHub.as_str(), "fallback_hub");
    }

    #[test]
    fn test_failure_record_serialization() {
        let record = FailureRecord {
            url: "https://example.com/p".to_string(),
            phase: Phase::Extraction,
            reason: "validation failed".to_string(),
            attempts_made: 4,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"phase\":\"extraction\""));
        assert!(json.contains("\"attempts_made\":4"));
    }
}
