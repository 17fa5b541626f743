//! Discovery metadata file (`url_metadata.json`)

use crate::model::DiscoveredUrl;
use crate::output::traits::OutputResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Provenance of every discovered product URL plus run-level figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_urls: usize,
    /// Share of resolved listings that reached `Exhausted`
    pub completeness: f64,
    /// Product URLs per category
    pub category_counts: BTreeMap<String, usize>,
    /// Category and listing URLs the products were found on
    pub listings: Vec<DiscoveredUrl>,
    /// Product URLs
    pub urls: Vec<DiscoveredUrl>,
}

impl UrlMetadata {
    /// Builds the metadata, counting product URLs per category
    pub fn new(listings: Vec<DiscoveredUrl>, urls: Vec<DiscoveredUrl>, completeness: f64) -> Self {
        let mut category_counts = BTreeMap::new();
        for entry in &urls {
            let category = entry
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            *category_counts.entry(category).or_insert(0) += 1;
        }

        Self {
            generated_at: Utc::now(),
            total_urls: urls.len(),
            completeness,
            category_counts,
            listings,
            urls,
        }
    }
}

pub fn write_metadata(path: &Path, metadata: &UrlMetadata) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_metadata(path: &Path) -> OutputResult<UrlMetadata> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscoverySource;
    use tempfile::TempDir;

    fn entry(url: &str, category: Option<&str>) -> DiscoveredUrl {
        DiscoveredUrl {
            url: url.to_string(),
            category: category.map(str::to_string),
            sub_category: None,
            source: DiscoverySource::PaginationExpansion,
            discovered_at: Utc::now(),
            validated: true,
        }
    }

    #[test]
    fn test_category_counts_and_roundtrip() {
        let metadata = UrlMetadata::new(
            vec![entry("https://a/uk/tvs/all-tvs", Some("tvs"))],
            vec![
                entry("https://a/uk/tvs/x-qe65", Some("tvs")),
                entry("https://a/uk/tvs/y-qe55", Some("tvs")),
                entry("https://a/uk/audio-sound/z-hw-q990d", Some("audio-sound")),
                entry("https://a/uk/misc", None),
            ],
            0.75,
        );
        assert_eq!(metadata.total_urls, 4);
        assert_eq!(metadata.category_counts["tvs"], 2);
        assert_eq!(metadata.category_counts["uncategorized"], 1);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("url_metadata.json");
        write_metadata(&path, &metadata).unwrap();
        assert_eq!(read_metadata(&path).unwrap(), metadata);
    }
}
