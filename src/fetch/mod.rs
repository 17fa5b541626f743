//! Tiered fetch layer
//!
//! Pages are fetched through one of two tiers:
//! - `Static`: a plain HTTP GET (cheap, no JavaScript)
//! - `Rendered`: a headless browser navigation that waits for the page to settle
//!
//! In `Auto` mode the static tier is tried first and the call escalates to the
//! rendered tier only when the caller requires structured product data and the
//! static content lacks it. Escalation never goes back down.
//!
//! Every request passes the robots gate and is admitted by the concurrency
//! controller before it starts. Rendered requests are admitted by the renderer
//! once it holds a browser page slot, so no admission waits on a slot.

mod renderer;
mod static_listing;
mod static_tier;

pub use renderer::{ChromeRenderer, PageGuard, PageRenderer};
pub use static_listing::StaticListing;
pub use static_tier::{build_http_client, fetch_static};

use crate::concurrency::ConcurrencyController;
use crate::config::Config;
use crate::extraction::has_structured_product;
use crate::pagination::ListingSession;
use crate::robots::RobotsGate;
use crate::url::host_key;
use crate::{FetchError, HarvestError};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Fetch tier that produced a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Static,
    Rendered,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Rendered => f.write_str("rendered"),
        }
    }
}

/// Tier selection requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Static first, escalating when required structured data is missing
    Auto,
    StaticOnly,
    RenderedOnly,
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: String,
    pub content: String,
    pub tier: Tier,
}

/// Decides whether static content must be re-fetched through the renderer
///
/// Pure: depends only on the content and the caller's requirement.
pub fn needs_escalation(content: &str, require_structured_data: bool) -> bool {
    require_structured_data && !has_structured_product(content)
}

/// Fetch layer shared by both phases
pub struct Fetcher {
    client: Client,
    renderer: Option<Arc<dyn PageRenderer>>,
    controller: Arc<ConcurrencyController>,
    robots: Arc<RobotsGate>,
    static_timeout: Duration,
}

impl Fetcher {
    /// Creates a fetcher with no rendered tier
    pub fn new(
        client: Client,
        controller: Arc<ConcurrencyController>,
        robots: Arc<RobotsGate>,
        static_timeout: Duration,
    ) -> Self {
        Self {
            client,
            renderer: None,
            controller,
            robots,
            static_timeout,
        }
    }

    /// Attaches a rendered tier
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Builds the fetcher described by the configuration
    ///
    /// When rendering is enabled but no browser can be launched, the fetcher
    /// falls back to the static tier only and logs a warning.
    pub async fn from_config(
        config: &Config,
        controller: Arc<ConcurrencyController>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(config)?;
        let robots = Arc::new(RobotsGate::new(
            client.clone(),
            config.user_agent.crawler_name.clone(),
            config.fetch.respect_robots,
        ));
        let fetcher = Self::new(
            client,
            controller,
            robots,
            Duration::from_millis(config.fetch.static_timeout_ms),
        );

        if !config.fetch.rendering {
            tracing::info!("Rendering disabled; using the static tier only");
            return Ok(fetcher);
        }

        match ChromeRenderer::launch(config).await {
            Ok(renderer) => Ok(fetcher.with_renderer(Arc::new(renderer))),
            Err(e) => {
                tracing::warn!("{}; continuing with the static tier only", e);
                Ok(fetcher)
            }
        }
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn controller(&self) -> &Arc<ConcurrencyController> {
        &self.controller
    }

    /// Fetches a page
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch
    /// * `mode` - Tier selection
    /// * `require_structured_data` - Whether the caller needs embedded product data
    ///
    /// # Returns
    ///
    /// The page content and the tier that produced it. In `Auto` mode without a
    /// renderer, static content is returned even when it lacks structured data.
    pub async fn fetch(
        &self,
        url: &str,
        mode: FetchMode,
        require_structured_data: bool,
    ) -> Result<FetchedPage, FetchError> {
        self.check_robots(url).await?;

        match mode {
            FetchMode::StaticOnly => self.fetch_static_tier(url).await,
            FetchMode::RenderedOnly => self.fetch_rendered_tier(url).await,
            FetchMode::Auto => {
                let page = self.fetch_static_tier(url).await?;
                if !needs_escalation(&page.content, require_structured_data) {
                    return Ok(page);
                }
                if self.renderer.is_none() {
                    tracing::debug!("No structured data in static {} and no renderer", url);
                    return Ok(page);
                }
                tracing::debug!("Escalating {} to the rendered tier", url);
                self.fetch_rendered_tier(url).await
            }
        }
    }

    /// Opens a listing for pagination
    ///
    /// Uses a live browser page when a renderer is attached, otherwise the
    /// statically fetched HTML.
    pub async fn open_listing(&self, url: &str) -> Result<Box<dyn ListingSession>, FetchError> {
        self.check_robots(url).await?;

        match &self.renderer {
            Some(renderer) => renderer.open_listing(url, &self.controller).await,
            None => {
                let page = self.fetch_static_tier(url).await?;
                Ok(Box::new(StaticListing::new(url, &page.content)))
            }
        }
    }

    async fn check_robots(&self, url: &str) -> Result<(), FetchError> {
        if let Some(delay) = self.robots.check(url).await? {
            self.controller.raise_host_delay(&host_key(url), delay).await;
        }
        Ok(())
    }

    async fn fetch_static_tier(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let _admission = self.controller.admit(url).await?;
        fetch_static(&self.client, url, self.static_timeout).await
    }

    async fn fetch_rendered_tier(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let Some(renderer) = &self.renderer else {
            return Err(FetchError::RendererUnavailable {
                url: url.to_string(),
            });
        };

        let content = renderer.render(url, &self.controller).await?;
        Ok(FetchedPage {
            final_url: url.to_string(),
            content,
            tier: Tier::Rendered,
        })
    }
}
