//! Sitemap Navigator
//!
//! Walks the sitemap tree breadth-first and collects category/listing URLs.
//! Top-level sections the walk did not reach get their fallback hub instead.

use crate::config::{CategoryEntry, SiteConfig};
use crate::discovery::parser::parse_sitemap;
use crate::fetch::{FetchMode, Fetcher};
use crate::model::{DiscoveredUrl, DiscoverySource};
use crate::url::{LinkClass, SiteRules};
use crate::{HarvestError, Result};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// A node waiting in the BFS queue
struct Node {
    url: Url,
    depth: u32,
}

/// Enumerates category URLs from the sitemap and the fallback hubs
pub struct SitemapNavigator {
    fetcher: Arc<Fetcher>,
    rules: Arc<SiteRules>,
    sitemap_url: String,
    max_depth: u32,
    categories: Vec<CategoryEntry>,
}

impl SitemapNavigator {
    pub fn new(fetcher: Arc<Fetcher>, rules: Arc<SiteRules>, site: &SiteConfig) -> Self {
        Self {
            fetcher,
            rules,
            sitemap_url: site.sitemap_url.clone(),
            max_depth: site.sitemap_max_depth,
            categories: site.categories.clone(),
        }
    }

    /// Discovers every category URL
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<DiscoveredUrl>)` - Category URLs sorted by URL, unique by normalized URL
    /// * `Err(HarvestError::NoSeeds)` - Nothing came from the sitemap and no fallback hub applies
    pub async fn discover_category_urls(&self) -> Result<Vec<DiscoveredUrl>> {
        let mut found = self.walk().await;

        if found.is_empty() {
            tracing::warn!(
                "Structural anomaly: sitemap {} yielded no category URLs; using fallback hubs",
                self.sitemap_url
            );
        }
        self.inject_fallback_hubs(&mut found);

        if found.is_empty() {
            tracing::error!("No category URLs from the sitemap and no fallback hubs configured");
            return Err(HarvestError::NoSeeds);
        }

        tracing::info!("Discovered {} category URLs", found.len());
        Ok(found.into_values().collect())
    }

    /// BFS over sitemap documents and category pages
    ///
    /// Category pages below `max_depth` are fetched and their links followed;
    /// categories found at `max_depth` are recorded without being fetched.
    /// Child sitemap documents are fetched down to `max_depth` itself.
    async fn walk(&self) -> BTreeMap<String, DiscoveredUrl> {
        let mut found = BTreeMap::new();

        let root = match self.rules.canonicalize(&self.sitemap_url, None) {
            Some(url) => url,
            None => match Url::parse(&self.sitemap_url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Structural anomaly: bad sitemap URL {}: {}", self.sitemap_url, e);
                    return found;
                }
            },
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(root.to_string());
        queue.push_back(Node {
            url: root,
            depth: 0,
        });

        while let Some(node) = queue.pop_front() {
            let page = match self
                .fetcher
                .fetch(node.url.as_str(), FetchMode::Auto, false)
                .await
            {
                Ok(page) => page,
                Err(e) if node.depth == 0 => {
                    tracing::warn!("Structural anomaly: sitemap unreachable: {}", e);
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping sitemap node {}: {}", node.url, e);
                    continue;
                }
            };

            let base = Url::parse(&page.final_url).unwrap_or_else(|_| node.url.clone());
            let document = parse_sitemap(&page.content, &base);
            tracing::debug!(
                "Sitemap node {} ({:?}): {} links, {} child sitemaps",
                node.url,
                document.kind,
                document.links.len(),
                document.child_sitemaps.len()
            );

            let child_depth = node.depth + 1;

            for child in &document.child_sitemaps {
                let Ok(url) = Url::parse(child) else { continue };
                if child_depth <= self.max_depth && visited.insert(url.to_string()) {
                    queue.push_back(Node {
                        url,
                        depth: child_depth,
                    });
                }
            }

            for link in &document.links {
                let Some(url) = self.rules.canonicalize(link, Some(&base)) else {
                    continue;
                };
                if self.rules.classify_url(&url) != LinkClass::Category {
                    continue;
                }

                let key = url.to_string();
                if found.contains_key(&key) {
                    continue;
                }
                found.insert(key.clone(), self.entry(&url, DiscoverySource::Sitemap));

                if child_depth < self.max_depth && visited.insert(key) {
                    queue.push_back(Node {
                        url,
                        depth: child_depth,
                    });
                }
            }
        }

        found
    }

    /// Adds the fallback hub of every configured section missing from `found`
    fn inject_fallback_hubs(&self, found: &mut BTreeMap<String, DiscoveredUrl>) {
        let present: HashSet<String> = found
            .values()
            .filter_map(|entry| entry.category.clone())
            .collect();

        for category in &self.categories {
            let name = category.name.to_lowercase();
            if present.contains(&name) {
                continue;
            }

            let Some(hub) = &category.fallback_hub else {
                tracing::warn!("Section {} missing from the sitemap and has no fallback hub", name);
                continue;
            };
            let Some(url) = self.rules.canonicalize(hub, None) else {
                tracing::warn!("Fallback hub {} for {} is out of scope", hub, name);
                continue;
            };

            tracing::info!("Section {} missing from the sitemap; using fallback hub {}", name, url);
            let key = url.to_string();
            found
                .entry(key)
                .or_insert_with(|| self.entry(&url, DiscoverySource::FallbackHub));
        }
    }

    fn entry(&self, url: &Url, source: DiscoverySource) -> DiscoveredUrl {
        let (category, sub_category) = self.rules.category_of(url);
        DiscoveredUrl {
            url: url.to_string(),
            category,
            sub_category,
            source,
            discovered_at: Utc::now(),
            validated: self.rules.classify_url(url) == LinkClass::Category,
        }
    }
}
