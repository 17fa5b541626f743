//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_harvest::concurrency::ConcurrencyController;
use catalog_harvest::config::{CategoryEntry, Config, SiteConfig};
use catalog_harvest::fetch::{Fetcher, PageRenderer};
use catalog_harvest::pagination::{Activation, ListingSession, RevealControl};
use catalog_harvest::robots::RobotsGate;
use catalog_harvest::FetchError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A configuration pointed at a mock server, with no delays and no browser
pub fn test_config(base_url: &str, output_dir: &Path) -> Config {
    let hub = |name: &str| Some(format!("{}/uk/{}/all-{}/", base_url, name, name));

    let mut config = Config::default();
    config.site = SiteConfig {
        base_url: base_url.to_string(),
        domain: "127.0.0.1".to_string(),
        sitemap_url: format!("{}/uk/info/sitemap/", base_url),
        categories: vec![
            CategoryEntry {
                name: "tvs".to_string(),
                fallback_hub: hub("tvs"),
            },
            CategoryEntry {
                name: "audio-sound".to_string(),
                fallback_hub: hub("audio-sound"),
            },
        ],
        ..SiteConfig::default()
    };
    config.fetch.rendering = false;
    config.fetch.respect_robots = false;
    config.fetch.static_timeout_ms = 5_000;
    config.concurrency.crawl_delay_ms = 0;
    config.concurrency.jitter_ms = 0;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.jitter_ms = 0;
    config.output.directory = output_dir.to_string_lossy().into_owned();
    config
}

/// A static-only fetcher with no delays
pub fn static_fetcher() -> Fetcher {
    let client = reqwest::Client::new();
    let controller = Arc::new(ConcurrencyController::with_limits(
        4,
        4,
        Duration::ZERO,
        Duration::ZERO,
    ));
    let robots = Arc::new(RobotsGate::new(client.clone(), "TestBot", false));
    Fetcher::new(client, controller, robots, Duration::from_secs(5))
}

pub fn product_page(name: &str, sku: &str, price: &str, currency: &str) -> String {
    format!(
        r#"<html><head><title>{name} | Samsung UK</title>
        <script type="application/ld+json">
        {{"@context":"https://schema.org","@type":"Product","name":"{name}","sku":"{sku}",
          "image":"/uk/images/{sku}.png","description":"A product.",
          "offers":{{"@type":"Offer","price":"{price}","priceCurrency":"{currency}",
                     "availability":"https://schema.org/InStock"}}}}
        </script></head><body><h1>{name}</h1></body></html>"#
    )
}

/// Renderer fake that counts calls and serves canned pages and listings
///
/// With `slots` set, every page holds a permit the way browser tabs do, and an
/// open listing keeps it until dropped.
#[derive(Default)]
pub struct FakeRenderer {
    pub pages: HashMap<String, String>,
    pub listings: HashMap<String, (usize, usize)>,
    pub slots: Option<Arc<Semaphore>>,
    pub render_calls: AtomicUsize,
    pub listing_calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn render_count(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    async fn take_slot(&self, url: &str) -> Result<Option<OwnedSemaphorePermit>, FetchError> {
        let Some(slots) = &self.slots else {
            return Ok(None);
        };
        Arc::clone(slots)
            .acquire_owned()
            .await
            .map(Some)
            .map_err(|_| FetchError::Cancelled {
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<String, FetchError> {
        let _slot = self.take_slot(url).await?;
        let _admission = controller.admit(url).await?;
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn open_listing(
        &self,
        url: &str,
        controller: &ConcurrencyController,
    ) -> Result<Box<dyn ListingSession>, FetchError> {
        let slot = self.take_slot(url).await?;
        {
            let _admission = controller.admit(url).await?;
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
        }
        let (total, page_size) = self.listings.get(url).copied().ok_or_else(|| FetchError::Http {
            url: url.to_string(),
            status: 404,
        })?;
        let mut listing = LoadMoreListing::new(url, total, page_size);
        listing.slot = slot;
        Ok(Box::new(listing))
    }
}

/// A listing revealing `page_size` more products per "View more" click
pub struct LoadMoreListing {
    url: String,
    total: usize,
    page_size: usize,
    shown: usize,
    slot: Option<OwnedSemaphorePermit>,
}

impl LoadMoreListing {
    pub fn new(url: &str, total: usize, page_size: usize) -> Self {
        Self {
            url: url.to_string(),
            total,
            page_size,
            shown: page_size.min(total),
            slot: None,
        }
    }
}

#[async_trait]
impl ListingSession for LoadMoreListing {
    fn url(&self) -> &str {
        &self.url
    }

    async fn links(&mut self) -> Result<Vec<String>, FetchError> {
        let mut links: Vec<String> = (0..self.shown)
            .map(|i| format!("/uk/tvs/qled-tv/model-{}-qe{:02}q80datxxu/", i, i))
            .collect();
        links.push("/uk/offer/".to_string());
        links.push("/uk/tvs/all-tvs/?filter=size".to_string());
        Ok(links)
    }

    async fn controls(&mut self) -> Result<Vec<RevealControl>, FetchError> {
        let mut controls = vec![RevealControl {
            index: 0,
            text: "Load more".to_string(),
            classes: "filter-load-more".to_string(),
            ancestor_classes: vec!["filter-panel".to_string()],
            enabled: true,
            visible: true,
            ..Default::default()
        }];
        if self.shown < self.total {
            controls.push(RevealControl {
                index: 1,
                text: "View more".to_string(),
                classes: "pd19-product-finder__view-more-btn".to_string(),
                ancestor_classes: vec!["pd19-product-finder".to_string()],
                matches_reveal_selector: true,
                enabled: true,
                visible: false,
            });
        }
        Ok(controls)
    }

    async fn activate(
        &mut self,
        control: &RevealControl,
        _activation: Activation,
    ) -> Result<(), FetchError> {
        if control.matches_reveal_selector {
            self.shown = (self.shown + self.page_size).min(self.total);
        }
        Ok(())
    }

    async fn settle(&mut self) -> Result<(), FetchError> {
        Ok(())
    }
}
