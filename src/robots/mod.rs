//! Robots.txt handling module
//!
//! robots.txt is fetched once per host per run. Disallowed URLs are refused
//! with `FetchError::RobotsDenied`, and the stated crawl-delay is handed back
//! to the caller so the concurrency controller can widen the host's spacing.

mod parser;

pub use parser::ParsedRobots;

use crate::FetchError;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Per-run robots.txt gate
pub struct RobotsGate {
    client: Client,
    agent: String,
    enabled: bool,
    cache: Mutex<HashMap<String, Arc<ParsedRobots>>>,
}

impl RobotsGate {
    /// Creates a gate
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt
    /// * `agent` - Product token matched against `User-agent` groups
    /// * `enabled` - When false every URL is allowed and no file is fetched
    pub fn new(client: Client, agent: impl Into<String>, enabled: bool) -> Self {
        Self {
            client,
            agent: agent.into(),
            enabled,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Checks a URL against its host's robots.txt
    ///
    /// # Returns
    ///
    /// * `Ok(Some(delay))` - Allowed, and the host states a crawl-delay
    /// * `Ok(None)` - Allowed without a stated delay
    /// * `Err(FetchError::RobotsDenied)` - Disallowed
    pub async fn check(&self, url: &str) -> Result<Option<Duration>, FetchError> {
        if !self.enabled {
            return Ok(None);
        }

        let Ok(parsed) = Url::parse(url) else {
            return Ok(None);
        };
        let robots = self.rules_for(&parsed).await;

        if !robots.is_allowed(url, &self.agent) {
            return Err(FetchError::RobotsDenied {
                url: url.to_string(),
            });
        }
        Ok(robots.crawl_delay(&self.agent))
    }

    async fn rules_for(&self, url: &Url) -> Arc<ParsedRobots> {
        let origin = url.origin().ascii_serialization();

        // held across the fetch so concurrent first requests share one download
        let mut cache = self.cache.lock().await;
        if let Some(robots) = cache.get(&origin) {
            return Arc::clone(robots);
        }

        let robots = Arc::new(self.fetch_robots(&origin).await);
        cache.insert(origin, Arc::clone(&robots));
        robots
    }

    async fn fetch_robots(&self, origin: &str) -> ParsedRobots {
        let robots_url = format!("{}/robots.txt", origin);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}; assuming allow-all", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "{} answered HTTP {}; assuming allow-all",
                robots_url,
                response.status()
            );
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => {
                tracing::info!("Loaded robots.txt from {}", robots_url);
                ParsedRobots::from_content(&body)
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}; assuming allow-all", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
